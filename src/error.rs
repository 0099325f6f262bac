// Error handling module
// Defines the error taxonomy surfaced by the API client

use thiserror::Error;

/// Errors that can occur while talking to the Finboard backend
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed and could not be recovered by a token refresh
    #[error("authentication failed: {message}")]
    Unauthorized { message: String },

    /// The backend answered with a non-success status other than 401
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Internal client error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Status code carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Network(err) => err.status().map(|s| s.as_u16()),
            ApiError::Internal(_) => None,
        }
    }

    /// True for 401 responses, recovered or not
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ApiError::Unauthorized {
            message: "Invalid token".to_string(),
        };
        assert_eq!(err.to_string(), "authentication failed: Invalid token");

        let err = ApiError::Api {
            status: 422,
            message: "email is required".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 422 - email is required");
    }

    #[test]
    fn test_internal_error_message() {
        let err = ApiError::Internal(anyhow::anyhow!("Something went wrong"));
        assert_eq!(err.to_string(), "internal error: Something went wrong");
    }

    #[test]
    fn test_status_accessor() {
        let err = ApiError::Unauthorized {
            message: "expired".to_string(),
        };
        assert_eq!(err.status(), Some(401));
        assert!(err.is_unauthorized());

        let err = ApiError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_unauthorized());

        let err = ApiError::Internal(anyhow::anyhow!("no status here"));
        assert_eq!(err.status(), None);
    }
}
