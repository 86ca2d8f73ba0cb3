use thiserror::Error;

/// Message used when the backend gives no explanation of its own.
pub const FALLBACK_MESSAGE: &str = "Something went wrong";

/// Everything that can go wrong talking to the backend.
///
/// `Clone` so a single result can be handed to every caller waiting on a
/// coalesced request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Transport(String),
    /// The backend answered with a failure; `message` is shown verbatim.
    #[error("{message}")]
    Backend {
        /// HTTP status (200 when the failure came from a `success:false` body).
        status: u16,
        /// The backend's `message` field, or [`FALLBACK_MESSAGE`].
        message: String,
    },
    /// The body was not valid JSON or did not match the expected record.
    #[error("Could not read response from {endpoint}: {reason}")]
    Decode {
        /// Endpoint that produced the body.
        endpoint: String,
        /// Parser error.
        reason: String,
    },
    /// The envelope held none of the keys expected for this endpoint.
    #[error("Unexpected response from {endpoint}")]
    UnexpectedShape {
        /// Endpoint that produced the body.
        endpoint: String,
    },
    /// The configured base URL and endpoint did not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub(crate) fn backend(status: u16, message: Option<String>) -> Self {
        ApiError::Backend {
            status,
            message: message
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
        }
    }

    /// True when the backend answered and refused the request: a 4xx status
    /// or a `success:false` body. Server errors (5xx) are not refusals.
    pub fn is_refusal(&self) -> bool {
        matches!(self, ApiError::Backend { status, .. } if *status < 500)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refusal_excludes_server_errors() {
        assert!(ApiError::backend(404, None).is_refusal());
        assert!(ApiError::backend(200, Some("User not found".to_string())).is_refusal());
        assert!(!ApiError::backend(502, None).is_refusal());
        assert!(!ApiError::Transport("timed out".to_string()).is_refusal());
    }

    #[test]
    fn blank_backend_message_falls_back() {
        assert_eq!(ApiError::backend(400, Some("  ".to_string())).to_string(), FALLBACK_MESSAGE);
    }
}
