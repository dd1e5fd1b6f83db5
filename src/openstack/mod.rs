/// OpenStack service integration module
///
/// Thin async clients for the identity (Keystone v3), compute (Nova v2) and
/// image (Glance v2) APIs, plus the session objects tying them together.
///
/// ## Flow
///
/// 1. [`Session::login`] exchanges a user/password pair for an identity token
/// 2. [`Session::scope_to_project`] exchanges that token for a project-scoped
///    token and returns a [`ProjectScope`]
/// 3. The scope uploads images and creates servers
/// 4. A [`ServerHandle`] polls status, assigns security groups and attaches
///    floating IPs
pub mod compute;
pub mod identity;
pub mod image;
pub mod project;
pub mod resources;
pub mod server;
pub mod session;
pub mod types;

pub use compute::NovaClient;
pub use identity::{IdentityToken, KeystoneClient, ProjectToken, TokenSubject};
pub use image::GlanceClient;
pub use project::ProjectScope;
pub use resources::*;
pub use server::ServerHandle;
pub use session::Session;
pub use types::{ApiError, OpenStackError};
