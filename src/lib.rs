//! Nanocloud OpenStack client
//!
//! A Rust library used by Nanocloud deployment tests to drive an OpenStack
//! cloud.
//!
//! This crate provides:
//! - Password authentication and project scoping against Keystone v3
//! - Server creation, status polling, security groups and floating IPs on Nova v2
//! - Two-phase image upload (register, then stream the file) on Glance v2
//! - Endpoint configuration from `DEPLOYMENT_OS_URL`, TOML, or explicit URLs
//!
//! # Example
//!
//! ```no_run
//! use nanocloud_openstack::{OpenStackConfig, ServerSpec, Session};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::login(OpenStackConfig::from_env(), "admin", "secret").await?;
//! let project = session.scope_to_project("8c3a5f").await?;
//!
//! let server = project
//!     .create_server(ServerSpec::new("windows-exec", "image-id", "3"))
//!     .await?;
//! println!("Status: {}", server.get_status().await?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod openstack;

// Re-export commonly used types
pub use config::OpenStackConfig;
pub use openstack::{
    compute::NovaClient,
    identity::{IdentityToken, KeystoneClient, ProjectToken, TokenSubject},
    image::GlanceClient,
    project::ProjectScope,
    resources::{FloatingIp, Image, ImageMetadata, Server, ServerSpec},
    server::ServerHandle,
    session::Session,
    types::{ApiError, OpenStackError},
};
