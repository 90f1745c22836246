use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("No endpoint configured for service '{0}'")]
    MissingEndpoint(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ApiError { status, .. } => Some(*status),
            ApiError::RequestError(e) => e.status().map(|s| s.as_u16()),
            ApiError::RateLimited => Some(429),
            _ => None,
        }
    }

    /// True for HTTP 404 responses
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Cloud error code carried in the response body, e.g. `DBS.200019` or
    /// `NoSuchBucket`
    pub fn error_code(&self) -> Option<&str> {
        match self {
            ApiError::ApiError { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
