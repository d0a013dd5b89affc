//! iBox Drive - REST adapter for the remote object store
//!
//! Speaks a Google Drive v2 style API:
//! - Paginated file listing (`GET /drive/v2/files`)
//! - Multipart insert and media update of file content
//! - Delete by identifier
//!
//! ## Modules
//!
//! - [`client`] - Authenticated HTTP client and status classification
//! - [`listing`] - One page of the file listing
//! - [`upload`] - Insert (multipart/related) and update (media) uploads
//! - [`provider`] - [`DriveRemoteStore`](provider::DriveRemoteStore), the `IRemoteStore` implementation

pub mod client;
pub mod listing;
pub mod provider;
pub mod upload;

use reqwest::StatusCode;
use thiserror::Error;

pub use client::DriveClient;
pub use provider::DriveRemoteStore;

/// Errors that can occur when talking to the Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// The bearer token was rejected (401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The requested file does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any other non-success status
    #[error("Request rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        message: String,
    },

    /// The response could not be parsed or lacked a required field
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Longest response body carried into an error message
const MAX_ERROR_BODY: usize = 512;

impl DriveError {
    /// Classifies a non-success status and its response body
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = truncate(body.trim(), MAX_ERROR_BODY);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DriveError::Unauthorized(message),
            StatusCode::NOT_FOUND => DriveError::NotFound(message),
            s if s.is_server_error() => DriveError::ServerError(message),
            s => DriveError::Rejected {
                status: s.as_u16(),
                message,
            },
        }
    }

    /// Returns true if the token must be renewed before retrying
    pub fn is_auth_error(&self) -> bool {
        matches!(self, DriveError::Unauthorized(_))
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
