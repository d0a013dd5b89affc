//! Domain error types
//!
//! Validation failures raised while constructing domain values from
//! untrusted input (remote responses, local paths).

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid local path (no final component, not representable)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A local file name that cannot be used as a remote title
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// Invalid remote identifier
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),
}
