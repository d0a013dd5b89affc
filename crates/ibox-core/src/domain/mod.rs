//! Domain entities
//!
//! - Newtypes for remote identifiers and titles
//! - The [`LocalFile`] handle used by every sync operation
//! - Domain-specific error types

pub mod errors;
pub mod local_file;
pub mod newtypes;

pub use errors::DomainError;
pub use local_file::LocalFile;
pub use newtypes::{FileTitle, RemoteId};
