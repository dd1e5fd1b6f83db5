use std::fmt;

/// OpenStack client error type
///
/// Every operation in this crate returns this single error type. Failures are
/// surfaced as-is: nothing is retried and no distinction is made between
/// transient and permanent errors.
#[derive(Debug)]
pub enum OpenStackError {
    /// API request failed (network, HTTP, or response parsing error)
    Api(ApiError),
    /// Local file operation failed (image upload source)
    Io(std::io::Error),
    /// Configuration error
    Config(String),
    /// Session client cache unusable
    Cache(String),
}

impl OpenStackError {
    /// HTTP status the service answered with, if the failure was a non-2xx reply
    pub fn status(&self) -> Option<u16> {
        match self {
            OpenStackError::Api(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OpenStackError::Api(err) if err.is_not_found())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, OpenStackError::Api(err) if err.is_unauthorized())
    }
}

impl fmt::Display for OpenStackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenStackError::Api(err) => write!(f, "API error: {}", err),
            OpenStackError::Io(err) => write!(f, "IO error: {}", err),
            OpenStackError::Config(msg) => write!(f, "Configuration error: {}", msg),
            OpenStackError::Cache(msg) => write!(f, "Client cache error: {}", msg),
        }
    }
}

impl std::error::Error for OpenStackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OpenStackError::Api(err) => Some(err),
            OpenStackError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiError> for OpenStackError {
    fn from(err: ApiError) -> Self {
        OpenStackError::Api(err)
    }
}

impl From<std::io::Error> for OpenStackError {
    fn from(err: std::io::Error) -> Self {
        OpenStackError::Io(err)
    }
}

impl From<toml::de::Error> for OpenStackError {
    fn from(err: toml::de::Error) -> Self {
        OpenStackError::Config(format!("Invalid TOML: {}", err))
    }
}

/// Failure talking to one of the OpenStack services
#[derive(Debug)]
pub enum ApiError {
    /// Service unreachable: connection refused, DNS failure, timeout
    Network(String),
    /// Non-2xx reply; `message` is the response body as sent by the service
    Http { status: u16, message: String },
    /// Reply body or headers did not have the expected shape
    Parse(String),
    /// Request could not be built (malformed URL or header value)
    Request(String),
}

impl ApiError {
    /// HTTP status code, when the service answered with one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The addressed resource (server, image, project) does not exist
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Credentials or token were rejected
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Http { status, message } if message.is_empty() => {
                write!(f, "HTTP {} with empty body", status)
            }
            ApiError::Http { status, message } => write!(f, "HTTP {}: {}", status, message),
            ApiError::Parse(msg) => write!(f, "Unexpected response, could not parse: {}", msg),
            ApiError::Request(msg) => write!(f, "Invalid request: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ApiError::Request(err.to_string())
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_timeout() {
            ApiError::Network(format!("timed out: {}", err))
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Turn a non-2xx response into an `ApiError::Http` carrying the body text
///
/// `context` names the operation in the error log line.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response, OpenStackError> {
    let status = response.status();
    tracing::debug!("{}: received response with status {}", context, status);

    if status.is_success() {
        return Ok(response);
    }

    let error_body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    tracing::error!(
        "{} failed: HTTP {} - {}",
        context,
        status.as_u16(),
        error_body
    );

    Err(OpenStackError::Api(ApiError::Http {
        status: status.as_u16(),
        message: error_body,
    }))
}

/// Deserialize a JSON response body, mapping failures to `ApiError::Parse`
pub(crate) async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, OpenStackError> {
    let response_text = response.text().await.map_err(|e| {
        tracing::error!("Failed to read {} response body: {}", context, e);
        OpenStackError::Api(ApiError::Parse(format!("Failed to read response: {}", e)))
    })?;

    serde_json::from_str(&response_text).map_err(|e| {
        tracing::error!(
            "Failed to parse {} response: {} - Response body: {}",
            context,
            e,
            response_text
        );
        OpenStackError::Api(ApiError::Parse(format!(
            "Failed to parse response: {} - Body: {}",
            e, response_text
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_status_code() {
        let err = OpenStackError::from(ApiError::Http {
            status: 401,
            message: "The request you have made requires authentication.".to_string(),
        });
        let text = err.to_string();
        assert!(text.contains("401"));
        assert!(text.starts_with("API error"));
    }

    #[test]
    fn test_status_only_for_http_errors() {
        assert_eq!(
            ApiError::Http {
                status: 404,
                message: String::new()
            }
            .status(),
            Some(404)
        );
        assert_eq!(ApiError::Parse("bad".to_string()).status(), None);
    }

    #[test]
    fn test_classification_helpers() {
        let not_found = OpenStackError::from(ApiError::Http {
            status: 404,
            message: "Instance could not be found".to_string(),
        });
        assert!(not_found.is_not_found());
        assert!(!not_found.is_unauthorized());
        assert_eq!(not_found.status(), Some(404));

        let forbidden = OpenStackError::from(ApiError::Http {
            status: 403,
            message: String::new(),
        });
        assert!(forbidden.is_unauthorized());
        assert_eq!(forbidden.to_string(), "API error: HTTP 403 with empty body");

        let io = OpenStackError::from(std::io::Error::new(std::io::ErrorKind::Other, "x"));
        assert_eq!(io.status(), None);
        assert!(!io.is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_url_is_request_error() {
        let err = reqwest::Client::new()
            .get("not a url")
            .send()
            .await
            .unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::Request(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "disk.qcow2");
        let err: OpenStackError = io.into();
        assert!(matches!(err, OpenStackError::Io(_)));
        assert!(err.to_string().contains("disk.qcow2"));
    }
}
