use crate::config::OpenStackConfig;
use crate::openstack::identity::{IdentityToken, KeystoneClient};
use crate::openstack::project::{ProjectScope, ScopedClients};
use crate::openstack::types::OpenStackError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Authenticated user session
///
/// Pairs the identity client with the token it issued so that project scopes
/// can be requested without passing the token around.
///
/// # Example
///
/// ```no_run
/// use nanocloud_openstack::{ImageMetadata, OpenStackConfig, ServerSpec, Session};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let session = Session::login(OpenStackConfig::from_env(), "admin", "secret").await?;
/// let project = session.scope_to_project("8c3a5f").await?;
///
/// let image = project
///     .upload_image("windows.qcow2", ImageMetadata::new("windows").with_formats("qcow2", "bare"))
///     .await?;
/// let server = project
///     .create_server(ServerSpec::new("windows-exec", image.id, "3"))
///     .await?;
///
/// while server.get_status().await? != "ACTIVE" {
///     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
/// }
/// server.assign_security_group("default").await?;
/// let ip = server.associate_floating_ip().await?;
/// println!("Server reachable at {}", ip.ip);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    config: OpenStackConfig,
    keystone: Arc<KeystoneClient>,
    token: IdentityToken,
    /// Compute/image clients keyed by project compute endpoint
    clients: Arc<RwLock<HashMap<String, ScopedClients>>>,
}

impl Session {
    /// Authenticate against the configured identity service
    pub async fn login(
        config: OpenStackConfig,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, OpenStackError> {
        let keystone = KeystoneClient::new(config.identity_url.clone())
            .with_user_domain(config.user_domain_id.clone());
        let token = keystone.login(username, password).await?;

        Ok(Self {
            config,
            keystone: Arc::new(keystone),
            token,
            clients: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn token(&self) -> &IdentityToken {
        &self.token
    }

    pub fn config(&self) -> &OpenStackConfig {
        &self.config
    }

    pub fn keystone(&self) -> &Arc<KeystoneClient> {
        &self.keystone
    }

    /// Obtain a project-scoped token and wrap it in a [`ProjectScope`]
    ///
    /// Scoping to the same project again issues a fresh project token but
    /// hands back the compute and image clients of the earlier scope.
    pub async fn scope_to_project(
        &self,
        project_id: impl Into<String>,
    ) -> Result<ProjectScope, OpenStackError> {
        let project = self.keystone.scope_to_project(&self.token, project_id).await?;
        let endpoint = self.config.compute_url_for(project.project_id());

        let clients = {
            let mut cache = self.clients.write().map_err(|e| {
                OpenStackError::Cache(format!("Client cache lock poisoned: {}", e))
            })?;

            if cache.contains_key(&endpoint) {
                tracing::debug!("Reusing cached clients for {}", endpoint);
            }
            cache.entry(endpoint).or_default().clone()
        };

        Ok(ProjectScope::with_clients(
            self.config.clone(),
            self.token.clone(),
            project,
            clients,
        ))
    }
}
