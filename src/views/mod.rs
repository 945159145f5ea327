//! View models driven by the CLI commands.
//!
//! Each view owns a cancellation token derived from the caller's token.
//! Dropping the view cancels its in-flight requests and timers.

pub mod copy_status;
pub mod home;
pub mod share;
pub mod sign_in;
pub mod sign_up;

use std::path::PathBuf;

use thiserror::Error;

use crate::api::auth::CredentialError;
use crate::api::ApiError;
use crate::download::DownloadError;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Rejected before any request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("No storage is loaded, cannot upload")]
    MissingStorage,

    #[error("No file with id {0}")]
    FileNotFound(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl ViewError {
    /// Whether the user needs to sign in again.
    pub fn is_unauthenticated(&self) -> bool {
        match self {
            ViewError::Api(e) => e.is_unauthenticated(),
            ViewError::Download(DownloadError::Api(e)) => e.is_unauthenticated(),
            _ => false,
        }
    }

    /// Failure recorded by a binding that returned no payload.
    pub(crate) fn from_binding(error: Option<ApiError>) -> Self {
        ViewError::Api(error.unwrap_or(ApiError::Cancelled))
    }
}
