//! Directory watching and sequential event dispatch
//!
//! Provides a [`DirectoryWatcher`] that wraps the `notify` crate to monitor a
//! single directory (non-recursive), converting raw OS events into
//! [`ChangeEvent`] values and handing each one to an [`IFileObserver`].
//!
//! ## Architecture
//!
//! ```text
//! inotify / kqueue / poll
//!       │  (notify thread)
//!       ▼
//!  map_notify_event  ──→  mpsc::channel  ──→  DirectoryWatcher::run  ──→  IFileObserver
//! ```
//!
//! `run` awaits the listener for each event before receiving the next one,
//! so a watched directory never has two remote operations in flight. Events
//! are not deduplicated: rapid saves produce repeated `Modified` events and
//! the listener is expected to be idempotent for them.
//!
//! Only files are mirrored. Subdirectories of the watched directory are
//! remembered so that their removal or rename never reaches the listener as
//! a file deletion.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ibox_core::config::{WatcherBackend, WatcherConfig};
use ibox_core::ports::IFileObserver;
use notify::event::{MetadataKind, ModifyKind, RemoveKind, RenameMode};
use notify::{EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::SyncError;

// ============================================================================
// ChangeEvent
// ============================================================================

/// A filesystem change inside the watched directory
///
/// Decoupled from the `notify` crate's raw event types. Renames are reported
/// as a deletion of the old name followed by a creation of the new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A new file appeared at the given path
    Created(PathBuf),
    /// An existing file changed
    Modified(PathBuf),
    /// A file was removed from the given path
    Deleted(PathBuf),
}

impl ChangeEvent {
    /// Returns the path associated with this event
    pub fn path(&self) -> &Path {
        match self {
            ChangeEvent::Created(p) => p,
            ChangeEvent::Modified(p) => p,
            ChangeEvent::Deleted(p) => p,
        }
    }

    /// Short lowercase name of the event kind, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Created(_) => "created",
            ChangeEvent::Modified(_) => "modified",
            ChangeEvent::Deleted(_) => "deleted",
        }
    }
}

// ============================================================================
// DirectoryWatcher
// ============================================================================

/// Watches one directory and forwards its file events to a listener
///
/// Dropping the watcher stops observation.
///
/// ## Usage
///
/// ```ignore
/// let manager: Arc<SyncManager> = Arc::new(SyncManager::new(store, policy));
/// let watcher = DirectoryWatcher::register(Path::new("/home/user/iBox"), manager)?;
/// watcher.run(shutdown_token).await;
/// ```
pub struct DirectoryWatcher {
    /// The underlying notify watcher; kept alive for the lifetime of the watch
    _watcher: Box<dyn Watcher + Send>,
    /// Canonical path of the watched directory
    root: PathBuf,
    /// Receiver for mapped events
    event_rx: mpsc::Receiver<ChangeEvent>,
    /// Listener receiving every event
    listener: Arc<dyn IFileObserver>,
    /// Subdirectories currently known to exist under `root`
    subdirs: HashSet<PathBuf>,
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl DirectoryWatcher {
    /// Starts observing `directory` with OS-native notifications
    ///
    /// # Errors
    /// Returns [`SyncError::WatchSetup`] if the path does not exist, is not a
    /// directory, or the OS watch cannot be installed
    pub fn register(
        directory: &Path,
        listener: Arc<dyn IFileObserver>,
    ) -> Result<Self, SyncError> {
        Self::register_with(directory, listener, &WatcherConfig::default())
    }

    /// Starts observing `directory` with the backend selected in `config`
    ///
    /// # Errors
    /// Returns [`SyncError::WatchSetup`] if the path does not exist, is not a
    /// directory, or the watch cannot be installed
    pub fn register_with(
        directory: &Path,
        listener: Arc<dyn IFileObserver>,
        config: &WatcherConfig,
    ) -> Result<Self, SyncError> {
        let root = validate_directory(directory)?;
        let subdirs = list_subdirectories(&root);
        let (event_tx, event_rx) = mpsc::channel::<ChangeEvent>(config.channel_capacity.max(1));

        info!(
            path = %root.display(),
            backend = ?config.backend,
            "Registering directory watcher"
        );

        let filter_root = root.clone();
        let handler = move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                for change in map_notify_event(&event) {
                    if change.path().parent() != Some(filter_root.as_path()) {
                        debug!(path = %change.path().display(), "Ignoring event outside watched directory");
                        continue;
                    }
                    if let Err(e) = event_tx.blocking_send(change) {
                        warn!(error = %e, "Failed to send change event (receiver dropped)");
                    }
                }
            }
            Err(err) => {
                error!(error = %err, "File watcher error");
            }
        };

        let setup_error = |e: notify::Error| SyncError::WatchSetup {
            path: directory.to_path_buf(),
            reason: e.to_string(),
        };

        let mut watcher: Box<dyn Watcher + Send> = match config.backend {
            WatcherBackend::Native => Box::new(
                RecommendedWatcher::new(handler, notify::Config::default()).map_err(setup_error)?,
            ),
            WatcherBackend::Poll => Box::new(
                PollWatcher::new(
                    handler,
                    notify::Config::default()
                        .with_poll_interval(Duration::from_millis(config.poll_interval_ms)),
                )
                .map_err(setup_error)?,
            ),
        };

        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(setup_error)?;

        Ok(Self {
            _watcher: watcher,
            root,
            event_rx,
            listener,
            subdirs,
        })
    }

    /// Canonical path of the watched directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Hands one event to the listener and waits for it to finish
    ///
    /// Events for subdirectories are skipped: only files are mirrored. A
    /// deletion is recognised as a directory's when the path was last seen
    /// as a directory.
    pub async fn dispatch(&mut self, event: &ChangeEvent) -> anyhow::Result<()> {
        dispatch_to(self.listener.as_ref(), &mut self.subdirs, event).await
    }

    /// Dispatches events one at a time until `shutdown` is cancelled
    ///
    /// Listener failures are logged and do not stop the loop.
    pub async fn run(self, shutdown: CancellationToken) {
        // The notify handle must outlive the loop; dropping it ends the watch.
        let Self {
            _watcher: _handle,
            root,
            mut event_rx,
            listener,
            mut subdirs,
        } = self;

        info!(path = %root.display(), "Watching directory");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping directory watcher");
                    break;
                }
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        warn!("Watcher event channel closed");
                        break;
                    };
                    if let Err(err) = dispatch_to(listener.as_ref(), &mut subdirs, &event).await {
                        log_dispatch_failure(&event, &err);
                    }
                }
            }
        }

        info!(path = %root.display(), "Directory watcher stopped");
    }
}

async fn dispatch_to(
    listener: &dyn IFileObserver,
    subdirs: &mut HashSet<PathBuf>,
    event: &ChangeEvent,
) -> anyhow::Result<()> {
    let path = event.path();
    debug!(path = %path.display(), kind = event.kind(), "Dispatching change event");

    match event {
        ChangeEvent::Created(_) | ChangeEvent::Modified(_) => {
            if path.is_dir() {
                subdirs.insert(path.to_path_buf());
                debug!(path = %path.display(), "Skipping directory event");
                return Ok(());
            }
            // a file may reuse the name of a removed directory
            subdirs.remove(path);
            if matches!(event, ChangeEvent::Created(_)) {
                listener.on_created(path).await
            } else {
                listener.on_modified(path).await
            }
        }
        ChangeEvent::Deleted(_) => {
            if subdirs.remove(path) {
                debug!(path = %path.display(), "Skipping removed directory");
                return Ok(());
            }
            listener.on_deleted(path).await
        }
    }
}

/// Collects the subdirectories present in `root` at registration time
fn list_subdirectories(root: &Path) -> HashSet<PathBuf> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %root.display(), error = %e, "Failed to list watched directory");
            return HashSet::new();
        }
    };

    entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect()
}

/// Checks that `directory` exists and is a directory, returning its canonical form
fn validate_directory(directory: &Path) -> Result<PathBuf, SyncError> {
    let root = std::fs::canonicalize(directory).map_err(|e| SyncError::WatchSetup {
        path: directory.to_path_buf(),
        reason: if e.kind() == std::io::ErrorKind::NotFound {
            "path does not exist".to_string()
        } else {
            e.to_string()
        },
    })?;

    if !root.is_dir() {
        return Err(SyncError::WatchSetup {
            path: directory.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    Ok(root)
}

fn log_dispatch_failure(event: &ChangeEvent, err: &anyhow::Error) {
    let path = event.path().display();
    match err.downcast_ref::<SyncError>() {
        Some(SyncError::FileNotFound { title }) => {
            warn!(%path, kind = event.kind(), %title, "Nothing to delete remotely");
        }
        Some(SyncError::LocalIo { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            warn!(%path, kind = event.kind(), "File vanished before it could be synced");
        }
        _ => {
            error!(%path, kind = event.kind(), error = %format!("{err:#}"), "Failed to sync change");
        }
    }
}

// ============================================================================
// Event mapping - notify::Event → ChangeEvent
// ============================================================================

/// Converts a `notify::Event` into zero or more `ChangeEvent`s
///
/// - `Create(*)` -> `Created`
/// - `Modify(Data | Any | Other)` and `Modify(Metadata(WriteTime))` -> `Modified`
/// - `Modify(Name(From))` -> `Deleted`, `Modify(Name(To))` -> `Created`
/// - `Modify(Name(Both))` -> nothing, its halves arrive as `From` and `To`
/// - `Modify(Name(Any | Other))` -> `Created` if the path exists, else `Deleted`
/// - `Remove(Folder)` -> nothing, only files are mirrored
/// - `Remove(*)` -> `Deleted`
///
/// Access events and other metadata changes are ignored.
fn map_notify_event(event: &notify::Event) -> Vec<ChangeEvent> {
    let paths = &event.paths;
    let Some(first) = paths.first() else {
        return Vec::new();
    };

    let mapped = match &event.kind {
        EventKind::Create(_) => vec![ChangeEvent::Created(first.clone())],

        EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Other)
        | EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)) => {
            vec![ChangeEvent::Modified(first.clone())]
        }

        // inotify reports each half of the rename as From/To as well
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => Vec::new(),

        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            vec![ChangeEvent::Deleted(first.clone())]
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            vec![ChangeEvent::Created(first.clone())]
        }

        EventKind::Modify(ModifyKind::Name(_)) => {
            if first.exists() {
                vec![ChangeEvent::Created(first.clone())]
            } else {
                vec![ChangeEvent::Deleted(first.clone())]
            }
        }

        EventKind::Remove(RemoveKind::Folder) => Vec::new(),

        EventKind::Remove(_) => vec![ChangeEvent::Deleted(first.clone())],

        _ => {
            debug!(kind = ?event.kind, "Ignoring event kind");
            Vec::new()
        }
    };

    for change in &mapped {
        debug!(path = %change.path().display(), kind = change.kind(), raw = ?event.kind, "Mapped event");
    }
    mapped
}

// ============================================================================
// Unit tests
// ============================================================================
