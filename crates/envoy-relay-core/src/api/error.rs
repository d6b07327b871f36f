use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The portal rejected the configured username/password.
    #[error("Wrong username or password for Enlighten")]
    BadCredentials,

    #[error("Cannot connect to Enlighten")]
    CloudUnreachable(#[source] reqwest::Error),

    #[error("Cannot connect to Envoy")]
    DeviceUnreachable(#[source] reqwest::Error),

    #[error("Envoy rejected the access token")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Malformed telemetry payload: {0}")]
    MalformedPayload(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Errors that retrying cannot fix without operator action.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::BadCredentials)
    }
}
