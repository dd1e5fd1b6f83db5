//! Service endpoint configuration
//!
//! Endpoints are derived from a single base URL by appending the fixed
//! port/version suffix of each service:
//!
//! | Service  | Suffix       |
//! |----------|--------------|
//! | identity | `:5000/v3`   |
//! | compute  | `:8774/v2`   |
//! | image    | `:9292/v2`   |
//!
//! The base URL comes from `DEPLOYMENT_OS_URL` when set, otherwise
//! [`DEFAULT_BASE_URL`]. Each service URL can be overridden on its own, either
//! with the builder methods or in a TOML file.

use crate::openstack::identity::DEFAULT_USER_DOMAIN;
use crate::openstack::types::OpenStackError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "DEPLOYMENT_OS_URL";

pub const DEFAULT_BASE_URL: &str = "http://openstack.nanocloud.org";

const IDENTITY_SUFFIX: &str = ":5000/v3";
const COMPUTE_SUFFIX: &str = ":8774/v2";
const IMAGE_SUFFIX: &str = ":9292/v2";

/// Resolved endpoints and account settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenStackConfig {
    /// Identity service endpoint (Keystone v3)
    pub identity_url: String,
    /// Compute service endpoint without the project id (Nova v2)
    pub compute_url: String,
    /// Image service endpoint (Glance v2)
    pub image_url: String,
    /// Domain user names are resolved in
    pub user_domain_id: String,
    /// Pool new floating IPs are allocated from; service default when unset
    pub floating_ip_pool: Option<String>,
}

/// On-disk representation; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    base_url: Option<String>,
    identity_url: Option<String>,
    compute_url: Option<String>,
    image_url: Option<String>,
    user_domain_id: Option<String>,
    floating_ip_pool: Option<String>,
}

impl Default for OpenStackConfig {
    fn default() -> Self {
        Self::from_base_url(DEFAULT_BASE_URL)
    }
}

impl OpenStackConfig {
    /// Derive all service endpoints from one base URL
    pub fn from_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            identity_url: format!("{}{}", base, IDENTITY_SUFFIX),
            compute_url: format!("{}{}", base, COMPUTE_SUFFIX),
            image_url: format!("{}{}", base, IMAGE_SUFFIX),
            user_domain_id: DEFAULT_USER_DOMAIN.to_string(),
            floating_ip_pool: None,
        }
    }

    /// Build from `DEPLOYMENT_OS_URL`, falling back to [`DEFAULT_BASE_URL`]
    pub fn from_env() -> Self {
        let base_url = base_url_from_env();
        tracing::debug!("Using OpenStack base URL: {}", base_url);
        Self::from_base_url(&base_url)
    }

    /// Parse a TOML document
    ///
    /// ```
    /// use nanocloud_openstack::OpenStackConfig;
    ///
    /// let config = OpenStackConfig::from_toml_str(r#"
    ///     base_url = "http://cloud.example.org"
    ///     floating_ip_pool = "public"
    /// "#).unwrap();
    /// assert_eq!(config.identity_url, "http://cloud.example.org:5000/v3");
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, OpenStackError> {
        let file: ConfigFile = toml::from_str(content)?;

        let base_url = file.base_url.unwrap_or_else(base_url_from_env);
        let mut config = Self::from_base_url(&base_url);

        if let Some(url) = file.identity_url {
            config = config.with_identity_url(url);
        }
        if let Some(url) = file.compute_url {
            config = config.with_compute_url(url);
        }
        if let Some(url) = file.image_url {
            config = config.with_image_url(url);
        }
        if let Some(domain) = file.user_domain_id {
            config.user_domain_id = domain;
        }
        config.floating_ip_pool = file.floating_ip_pool;

        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OpenStackError> {
        let path = path.as_ref();
        tracing::debug!("Loading OpenStack configuration from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| {
            OpenStackError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Override the identity endpoint (builder pattern)
    pub fn with_identity_url(mut self, url: impl Into<String>) -> Self {
        self.identity_url = trimmed(url);
        self
    }

    /// Override the compute endpoint (builder pattern)
    pub fn with_compute_url(mut self, url: impl Into<String>) -> Self {
        self.compute_url = trimmed(url);
        self
    }

    /// Override the image endpoint (builder pattern)
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = trimmed(url);
        self
    }

    /// Set the floating IP pool (builder pattern)
    pub fn with_floating_ip_pool(mut self, pool: impl Into<String>) -> Self {
        self.floating_ip_pool = Some(pool.into());
        self
    }

    /// Set the user domain id (builder pattern)
    pub fn with_user_domain(mut self, domain_id: impl Into<String>) -> Self {
        self.user_domain_id = domain_id.into();
        self
    }

    /// Compute endpoint for one project
    pub fn compute_url_for(&self, project_id: &str) -> String {
        format!("{}/{}", self.compute_url, project_id)
    }

    /// Reject empty endpoints and non-HTTP schemes
    pub fn validate(&self) -> Result<(), OpenStackError> {
        for (name, url) in [
            ("identity_url", &self.identity_url),
            ("compute_url", &self.compute_url),
            ("image_url", &self.image_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(OpenStackError::Config(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }
        if self.user_domain_id.is_empty() {
            return Err(OpenStackError::Config(
                "user_domain_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn base_url_from_env() -> String {
    std::env::var(BASE_URL_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

fn trimmed(url: impl Into<String>) -> String {
    url.into().trim_end_matches('/').to_string()
}
