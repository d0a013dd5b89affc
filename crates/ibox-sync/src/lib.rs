//! iBox Sync - Local directory to remote store synchronization engine
//!
//! Provides:
//! - Identity resolution of local file names against a remote listing
//! - Add / update (upsert) / delete of remote objects driven by local events
//! - A non-recursive directory watcher dispatching events one at a time
//!
//! ## Modules
//!
//! - [`remote_index`] - Paginated title lookup with a configurable tie-break
//! - [`manager`] - [`SyncManager`](manager::SyncManager), the three sync operations
//! - [`watcher`] - [`DirectoryWatcher`](watcher::DirectoryWatcher) over `notify`

pub mod manager;
pub mod remote_index;
pub mod watcher;

use std::path::PathBuf;

use ibox_core::domain::{DomainError, FileTitle};
use thiserror::Error;

pub use manager::SyncManager;
pub use remote_index::RemoteIndex;
pub use watcher::{ChangeEvent, DirectoryWatcher};

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// No remote object carries the requested title
    #[error("No remote object titled '{title}'")]
    FileNotFound {
        /// The title that failed to resolve
        title: FileTitle,
    },

    /// The remote service could not be reached or answered with an error
    #[error("Transport error: {0:#}")]
    Transport(anyhow::Error),

    /// A directory could not be registered for observation
    #[error("Cannot watch {path}: {reason}")]
    WatchSetup {
        /// The directory that was requested
        path: PathBuf,
        /// Why registration failed
        reason: String,
    },

    /// The local file could not be read
    #[error("Cannot read local file {path}: {source}")]
    LocalIo {
        /// The local file path
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// A path that cannot be mapped to a remote title
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl SyncError {
    /// Returns true for [`SyncError::FileNotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::FileNotFound { .. })
    }

    /// Returns true for [`SyncError::Transport`]
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }
}
