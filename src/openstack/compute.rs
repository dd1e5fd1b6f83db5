use crate::openstack::resources::{
    FloatingIp, FloatingIpEnvelope, FloatingIpList, Server, ServerEnvelope, ServerSpec,
};
use crate::openstack::types::{ensure_success, parse_json, ApiError, OpenStackError};
use serde_json::{json, Value};

/// HTTP client for the compute service (Nova v2), bound to one project
///
/// Every request carries the project-scoped token in `X-Auth-Token`.
#[derive(Debug, Clone)]
pub struct NovaClient {
    /// Project endpoint, e.g. `http://host:8774/v2/<project_id>`
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl NovaClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!("Creating NovaClient with base URL: {}", base_url);

        Self {
            base_url,
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Boot a new server; the spec is forwarded verbatim
    pub async fn create_server(&self, spec: &ServerSpec) -> Result<Server, OpenStackError> {
        let url = format!("{}/servers", self.base_url);

        tracing::info!("Creating server: name={}", spec.name);
        tracing::debug!("Sending create server request to: {}", url);

        let response = self
            .client
            .post(&url)
            .header("X-Auth-Token", &self.token)
            .json(&ServerEnvelope { server: spec })
            .send()
            .await
            .map_err(ApiError::from)?;

        let response = ensure_success(response, "Create server").await?;
        let envelope: ServerEnvelope<Server> = parse_json(response, "create server").await?;

        tracing::info!("Server created: id={}", envelope.server.id);

        Ok(envelope.server)
    }

    /// Fetch the live server record
    pub async fn get_server(&self, server_id: &str) -> Result<Server, OpenStackError> {
        let url = format!("{}/servers/{}", self.base_url, server_id);

        tracing::debug!("Getting server {} from: {}", server_id, url);

        let response = self
            .client
            .get(&url)
            .header("X-Auth-Token", &self.token)
            .send()
            .await
            .map_err(ApiError::from)?;

        let response = ensure_success(response, "Get server").await?;
        let envelope: ServerEnvelope<Server> = parse_json(response, "get server").await?;

        Ok(envelope.server)
    }

    pub async fn assign_security_group(
        &self,
        group_name: &str,
        server_id: &str,
    ) -> Result<(), OpenStackError> {
        tracing::info!(
            "Assigning security group: server_id={}, group={}",
            server_id,
            group_name
        );

        self.server_action(
            server_id,
            json!({ "addSecurityGroup": { "name": group_name } }),
            "Assign security group",
        )
        .await
    }

    /// List the project's floating IPs in service order
    pub async fn list_floating_ips(&self) -> Result<Vec<FloatingIp>, OpenStackError> {
        let url = format!("{}/os-floating-ips", self.base_url);

        tracing::debug!("Listing floating IPs from: {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Auth-Token", &self.token)
            .send()
            .await
            .map_err(ApiError::from)?;

        let response = ensure_success(response, "List floating IPs").await?;
        let list: FloatingIpList = parse_json(response, "floating IP list").await?;

        tracing::debug!("Found {} floating IPs", list.floating_ips.len());

        Ok(list.floating_ips)
    }

    /// Allocate a new floating IP, from `pool` when given
    pub async fn create_floating_ip(
        &self,
        pool: Option<&str>,
    ) -> Result<FloatingIp, OpenStackError> {
        let url = format!("{}/os-floating-ips", self.base_url);

        let payload = match pool {
            Some(pool) => json!({ "pool": pool }),
            None => json!({}),
        };

        tracing::info!("Allocating floating IP: pool={:?}", pool);

        let response = self
            .client
            .post(&url)
            .header("X-Auth-Token", &self.token)
            .json(&payload)
            .send()
            .await
            .map_err(ApiError::from)?;

        let response = ensure_success(response, "Allocate floating IP").await?;
        let envelope: FloatingIpEnvelope = parse_json(response, "floating IP").await?;

        tracing::info!("Floating IP allocated: ip={}", envelope.floating_ip.ip);

        Ok(envelope.floating_ip)
    }

    pub async fn associate_floating_ip(
        &self,
        server_id: &str,
        address: &str,
    ) -> Result<(), OpenStackError> {
        tracing::info!(
            "Associating floating IP: server_id={}, ip={}",
            server_id,
            address
        );

        self.server_action(
            server_id,
            json!({ "addFloatingIp": { "address": address } }),
            "Associate floating IP",
        )
        .await
    }

    /// POST to `/servers/{id}/action`; the response body is ignored
    async fn server_action(
        &self,
        server_id: &str,
        action: Value,
        context: &str,
    ) -> Result<(), OpenStackError> {
        let url = format!("{}/servers/{}/action", self.base_url, server_id);

        tracing::debug!("Sending server action to: {}", url);

        let response = self
            .client
            .post(&url)
            .header("X-Auth-Token", &self.token)
            .json(&action)
            .send()
            .await
            .map_err(ApiError::from)?;

        ensure_success(response, context).await?;
        Ok(())
    }
}
