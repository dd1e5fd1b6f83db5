use crate::config::OpenStackConfig;
use crate::openstack::compute::NovaClient;
use crate::openstack::identity::{IdentityToken, ProjectToken};
use crate::openstack::image::GlanceClient;
use crate::openstack::resources::{Image, ImageMetadata, ServerSpec};
use crate::openstack::server::ServerHandle;
use crate::openstack::types::OpenStackError;
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Arc;

/// Lazily built clients for one project endpoint
///
/// Cloning shares the cells, so every scope holding a clone sees the client
/// the first of them built. A client keeps the token of the scope that built it.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScopedClients {
    compute: Arc<OnceCell<Arc<NovaClient>>>,
    image: Arc<OnceCell<Arc<GlanceClient>>>,
}

/// A project-scoped view of the cloud
///
/// Holds the identity token it was derived from together with the
/// project-scoped token. The compute and image clients are built on first use
/// and then reused for the lifetime of the scope, and by every other scope of
/// the same project obtained from the same [`Session`](crate::Session).
#[derive(Debug)]
pub struct ProjectScope {
    config: OpenStackConfig,
    identity: IdentityToken,
    project: ProjectToken,
    clients: ScopedClients,
}

impl ProjectScope {
    /// Create a scope with its own, not yet built, clients
    pub fn new(config: OpenStackConfig, identity: IdentityToken, project: ProjectToken) -> Self {
        Self::with_clients(config, identity, project, ScopedClients::default())
    }

    pub(crate) fn with_clients(
        config: OpenStackConfig,
        identity: IdentityToken,
        project: ProjectToken,
        clients: ScopedClients,
    ) -> Self {
        Self {
            config,
            identity,
            project,
            clients,
        }
    }

    pub fn identity_token(&self) -> &IdentityToken {
        &self.identity
    }

    pub fn project_token(&self) -> &ProjectToken {
        &self.project
    }

    pub fn project_id(&self) -> &str {
        self.project.project_id()
    }

    /// Compute client for this project, created on first call
    pub fn compute(&self) -> &Arc<NovaClient> {
        self.clients.compute.get_or_init(|| {
            let url = self.config.compute_url_for(self.project_id());
            tracing::debug!("Initializing compute client for project {}", self.project_id());
            Arc::new(NovaClient::new(url, self.project.token.clone()))
        })
    }

    /// Image client for this project, created on first call
    pub fn image(&self) -> &Arc<GlanceClient> {
        self.clients.image.get_or_init(|| {
            tracing::debug!("Initializing image client for project {}", self.project_id());
            Arc::new(GlanceClient::new(
                self.config.image_url.clone(),
                self.project.token.clone(),
            ))
        })
    }

    /// Boot a server from `spec` and return a handle to it
    pub async fn create_server(&self, spec: ServerSpec) -> Result<ServerHandle, OpenStackError> {
        let server = self.compute().create_server(&spec).await?;
        Ok(ServerHandle::new(
            Arc::clone(self.compute()),
            server,
            self.config.floating_ip_pool.clone(),
        ))
    }

    /// Register `metadata`, then stream the file at `path` as the image data
    ///
    /// If the data upload fails, the registered image is left in place
    /// (queued, without data) and the upload error is returned.
    pub async fn upload_image(
        &self,
        path: impl AsRef<Path>,
        metadata: ImageMetadata,
    ) -> Result<Image, OpenStackError> {
        let path = path.as_ref();
        let image = self.image().queue_image(&metadata).await?;

        if let Err(e) = self.image().upload_image_data(&image.id, path).await {
            tracing::warn!(
                "Image {} registered but data upload failed; record left queued: {}",
                image.id,
                e
            );
            return Err(e);
        }

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openstack::identity::TokenSubject;

    fn scope() -> ProjectScope {
        let identity = IdentityToken {
            token: "unscoped".to_string(),
            expires_at: None,
            user: None,
            catalog: None,
        };
        let project = ProjectToken {
            token: "scoped".to_string(),
            expires_at: None,
            project: TokenSubject {
                id: "p-42".to_string(),
                name: Some("deploy".to_string()),
            },
            catalog: None,
        };
        ProjectScope::new(
            OpenStackConfig::from_base_url("http://cloud.local"),
            identity,
            project,
        )
    }

    #[test]
    fn test_clients_are_memoized() {
        let scope = scope();
        assert!(Arc::ptr_eq(scope.compute(), scope.compute()));
        assert!(Arc::ptr_eq(scope.image(), scope.image()));
    }

    #[test]
    fn test_shared_clients_are_reused_across_scopes() {
        let clients = ScopedClients::default();
        let first = ProjectScope::with_clients(
            scope().config.clone(),
            scope().identity.clone(),
            scope().project.clone(),
            clients.clone(),
        );
        let second = ProjectScope::with_clients(
            first.config.clone(),
            first.identity.clone(),
            first.project.clone(),
            clients,
        );

        assert!(Arc::ptr_eq(first.compute(), second.compute()));
        assert!(Arc::ptr_eq(second.image(), first.image()));
        assert!(!Arc::ptr_eq(first.compute(), scope().compute()));
    }

    #[test]
    fn test_client_endpoints() {
        let scope = scope();
        assert_eq!(scope.compute().base_url(), "http://cloud.local:8774/v2/p-42");
        assert_eq!(scope.image().base_url(), "http://cloud.local:9292/v2");
    }

    #[test]
    fn test_scope_keeps_identity_token() {
        let scope = scope();
        assert_eq!(scope.identity_token().token, "unscoped");
        assert_eq!(scope.project_token().token, "scoped");
        assert_eq!(scope.project_id(), "p-42");
    }
}
