//! Filesystem event listener port (driving/primary port)
//!
//! An event source (native OS notifications, a polling fallback, or a test
//! harness) reports local changes through this three-method capability.
//!
//! ## Design Notes
//!
//! - Methods are async because the listener performs remote calls; the event
//!   source awaits each call before dispatching the next event, so at most
//!   one operation is in flight per watched directory.
//! - Failures are returned to the event source, which decides whether to log
//!   and continue. Listeners never panic on a failed operation.

use std::path::Path;

/// Observer for filesystem change events
#[async_trait::async_trait]
pub trait IFileObserver: Send + Sync {
    /// Called when a new file is created
    async fn on_created(&self, path: &Path) -> anyhow::Result<()>;

    /// Called when an existing file is modified
    async fn on_modified(&self, path: &Path) -> anyhow::Result<()>;

    /// Called when a file is deleted
    async fn on_deleted(&self, path: &Path) -> anyhow::Result<()>;
}
