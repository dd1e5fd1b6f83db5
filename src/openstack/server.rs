use crate::openstack::compute::NovaClient;
use crate::openstack::resources::{FloatingIp, Server};
use crate::openstack::types::{ApiError, OpenStackError};
use std::sync::Arc;

/// Handle to a compute server
///
/// Only the identifier is relied upon; every query goes back to the compute
/// service. Callers that need to wait for a state loop over [`get_status`]
/// themselves.
///
/// [`get_status`]: ServerHandle::get_status
#[derive(Debug, Clone)]
pub struct ServerHandle {
    compute: Arc<NovaClient>,
    server: Server,
    floating_ip_pool: Option<String>,
}

impl ServerHandle {
    pub fn new(compute: Arc<NovaClient>, server: Server, floating_ip_pool: Option<String>) -> Self {
        Self {
            compute,
            server,
            floating_ip_pool,
        }
    }

    pub fn id(&self) -> &str {
        &self.server.id
    }

    /// Record returned when the server was created
    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn compute(&self) -> &Arc<NovaClient> {
        &self.compute
    }

    /// Fetch the live server record
    pub async fn get(&self) -> Result<Server, OpenStackError> {
        self.compute.get_server(self.id()).await
    }

    /// Fetch the current status, e.g. `BUILD` or `ACTIVE`
    pub async fn get_status(&self) -> Result<String, OpenStackError> {
        let server = self.get().await?;
        server.status.ok_or_else(|| {
            OpenStackError::Api(ApiError::Parse(format!(
                "Server {} has no status field",
                server.id
            )))
        })
    }

    /// Whether the compute service still knows this server
    ///
    /// A 404 maps to `Ok(false)`; every other failure is returned as-is.
    pub async fn exists(&self) -> Result<bool, OpenStackError> {
        match self.get().await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => {
                tracing::debug!("Server {} no longer exists", self.id());
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn assign_security_group(&self, group_name: &str) -> Result<(), OpenStackError> {
        self.compute.assign_security_group(group_name, self.id()).await
    }

    /// Attach a floating IP to this server
    ///
    /// Reuses the first unattached address in the order the service lists
    /// them; allocates a new one only when none is free.
    pub async fn associate_floating_ip(&self) -> Result<FloatingIp, OpenStackError> {
        let floating_ips = self.compute.list_floating_ips().await?;

        let ip = match floating_ips.into_iter().find(FloatingIp::is_available) {
            Some(ip) => {
                tracing::debug!("Reusing unattached floating IP {}", ip.ip);
                ip
            }
            None => {
                self.compute
                    .create_floating_ip(self.floating_ip_pool.as_deref())
                    .await?
            }
        };

        self.compute.associate_floating_ip(self.id(), &ip.ip).await?;

        tracing::info!("Floating IP {} associated with server {}", ip.ip, self.id());

        Ok(ip)
    }
}
