//! Error taxonomy for calls against the filejy backend.

use thiserror::Error;

/// Generic message stored when a GET returns a non-success status.
pub const FETCH_FAILED: &str = "Failed to fetch response";

/// Fallback message when a failed mutation carries no server `message`.
pub const MUTATION_FAILED: &str = "Mutation failed";

/// Failure of a single API call.
///
/// `Clone` so bindings can keep the last failure next to their data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The backend rejected the credential (401 or 403).
    /// The caller decides where to send the user; nothing is parsed from the body.
    #[error("Not signed in or session expired ({status})")]
    Unauthenticated { status: u16 },

    /// Any other non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Decode(String),

    /// The owning view was disposed before the call settled.
    #[error("Request cancelled")]
    Cancelled,
}

impl ApiError {
    /// `Some` for 401/403, so the caller can short-circuit before touching
    /// the response body. `None` for every other status.
    pub fn unauthenticated(status: reqwest::StatusCode) -> Option<Self> {
        match status.as_u16() {
            401 | 403 => Some(ApiError::Unauthenticated {
                status: status.as_u16(),
            }),
            _ => None,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ApiError::Unauthenticated { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}
