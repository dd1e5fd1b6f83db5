use crate::openstack::types::{ensure_success, parse_json, ApiError, OpenStackError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Header carrying the issued token on `POST /auth/tokens`
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Domain used when authenticating by user name
pub const DEFAULT_USER_DOMAIN: &str = "default";

/// Reference to a user or project inside a token body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSubject {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Unscoped identity token issued for a user/password pair
#[derive(Debug, Clone)]
pub struct IdentityToken {
    /// Opaque token value, sent as `X-Auth-Token`
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: Option<TokenSubject>,
    /// Service catalog, kept unparsed
    pub catalog: Option<Value>,
}

/// Identity token scoped to a single project
#[derive(Debug, Clone)]
pub struct ProjectToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub project: TokenSubject,
    pub catalog: Option<Value>,
}

/// A token without an expiry never expires
fn expired(expires_at: Option<DateTime<Utc>>) -> bool {
    expires_at.map_or(false, |expiry| expiry < Utc::now())
}

impl IdentityToken {
    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        expired(self.expires_at)
    }

    /// Check if the token is still valid (not expired)
    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }
}

impl ProjectToken {
    pub fn project_id(&self) -> &str {
        &self.project.id
    }

    pub fn is_expired(&self) -> bool {
        expired(self.expires_at)
    }

    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }
}

/// `token` object of an `/auth/tokens` response body
#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    expires_at: Option<String>,
    #[serde(default)]
    user: Option<TokenSubject>,
    #[serde(default)]
    project: Option<TokenSubject>,
    #[serde(default)]
    catalog: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

/// Parse an RFC 3339 expiry, treating an unparseable value as already expired
fn parse_expiry(raw: Option<String>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(expiry) => Some(expiry.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("Failed to parse token expiry date '{}': {}", raw, e);
            Some(DateTime::<Utc>::MIN_UTC)
        }
    }
}

/// HTTP client for the identity service (Keystone v3)
#[derive(Debug, Clone)]
pub struct KeystoneClient {
    /// Identity endpoint, e.g. `http://host:5000/v3`
    base_url: String,
    /// Domain the user name is resolved in
    user_domain_id: String,
    client: reqwest::Client,
}

impl KeystoneClient {
    /// Create a new identity client
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nanocloud_openstack::KeystoneClient;
    ///
    /// let keystone = KeystoneClient::new("http://openstack.nanocloud.org:5000/v3");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!("Creating KeystoneClient with base URL: {}", base_url);

        Self {
            base_url,
            user_domain_id: DEFAULT_USER_DOMAIN.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Set the user domain id (builder pattern)
    pub fn with_user_domain(mut self, domain_id: impl Into<String>) -> Self {
        self.user_domain_id = domain_id.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticate a user/password pair and obtain an unscoped token
    ///
    /// The underlying error is returned unchanged on failure; nothing is
    /// retried.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nanocloud_openstack::KeystoneClient;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let keystone = KeystoneClient::new("http://openstack.nanocloud.org:5000/v3");
    /// let token = keystone.login("admin", "secret").await?;
    /// println!("Token expires at {:?}", token.expires_at);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<IdentityToken, OpenStackError> {
        let username = username.into();
        let password = password.into();

        tracing::info!("Authenticating against identity service: user={}", username);

        let payload = json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": username,
                            "domain": { "id": self.user_domain_id },
                            "password": password,
                        }
                    }
                }
            }
        });

        let (token, body) = self
            .issue_token(&payload, "Login")
            .await
            .inspect_err(|e| {
                if e.is_unauthorized() {
                    tracing::warn!("Identity service rejected credentials for user={}", username);
                }
            })?;

        tracing::info!(
            "Authenticated successfully: user={}, expires_at={:?}",
            username,
            body.expires_at
        );

        Ok(IdentityToken {
            token,
            expires_at: parse_expiry(body.expires_at),
            user: body.user,
            catalog: body.catalog,
        })
    }

    /// Exchange an identity token for a token scoped to `project_id`
    pub async fn scope_to_project(
        &self,
        identity: &IdentityToken,
        project_id: impl Into<String>,
    ) -> Result<ProjectToken, OpenStackError> {
        let project_id = project_id.into();

        tracing::info!("Requesting project-scoped token: project_id={}", project_id);

        let payload = json!({
            "auth": {
                "identity": {
                    "methods": ["token"],
                    "token": { "id": identity.token }
                },
                "scope": {
                    "project": { "id": project_id }
                }
            }
        });

        let (token, body) = self
            .issue_token(&payload, "Project scope")
            .await
            .inspect_err(|e| {
                if e.is_not_found() || e.is_unauthorized() {
                    tracing::warn!(
                        "Project {} unknown or not accessible with this token",
                        project_id
                    );
                }
            })?;

        // Fall back to the requested id when the body carries no project.
        let project = body.project.unwrap_or_else(|| TokenSubject {
            id: project_id.clone(),
            name: None,
        });

        tracing::info!(
            "Project token issued: project_id={}, expires_at={:?}",
            project.id,
            body.expires_at
        );

        Ok(ProjectToken {
            token,
            expires_at: parse_expiry(body.expires_at),
            project,
            catalog: body.catalog,
        })
    }

    /// POST to `/auth/tokens` and return the subject token plus the token body
    async fn issue_token(
        &self,
        payload: &Value,
        context: &str,
    ) -> Result<(String, TokenBody), OpenStackError> {
        let url = format!("{}/auth/tokens", self.base_url);

        tracing::debug!("Sending token request to: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send token request: {}", e);
                ApiError::from(e)
            })?;

        let response = ensure_success(response, context).await?;

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                tracing::error!("{} response is missing the {} header", context, SUBJECT_TOKEN_HEADER);
                ApiError::Parse(format!("Missing {} header", SUBJECT_TOKEN_HEADER))
            })?;

        tracing::debug!("Subject token length: {}", token.len());

        let body: TokenResponse = parse_json(response, context).await?;

        Ok((token, body.token))
    }
}
