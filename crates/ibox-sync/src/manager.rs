//! Synchronization manager
//!
//! The [`SyncManager`] turns one local change into exactly one remote
//! operation:
//!
//! | Local change | Remote operation |
//! |--------------|------------------|
//! | created      | insert (no duplicate check) |
//! | modified     | update in place, or insert when nothing matches (upsert) |
//! | deleted      | delete by identifier; `FileNotFound` when nothing matches |
//!
//! Identity is resolved through [`RemoteIndex`] on every call. There is no
//! client-side locking and no retry: transport failures are returned to the
//! caller unchanged.

use std::path::Path;
use std::sync::Arc;

use ibox_core::config::{Config, DuplicateTitlePolicy};
use ibox_core::domain::{LocalFile, RemoteId};
use ibox_core::ports::{IFileObserver, IRemoteStore};
use tracing::{debug, info, instrument};

use crate::remote_index::RemoteIndex;
use crate::SyncError;

/// Mirrors local file changes to the remote store
pub struct SyncManager {
    /// Remote object store used for mutations
    store: Arc<dyn IRemoteStore + Send + Sync>,
    /// Title to identifier resolution over the same store
    index: RemoteIndex,
}

impl SyncManager {
    /// Creates a `SyncManager` over `store` with the given tie-break policy
    pub fn new(store: Arc<dyn IRemoteStore + Send + Sync>, policy: DuplicateTitlePolicy) -> Self {
        let index = RemoteIndex::new(Arc::clone(&store), policy);
        Self { store, index }
    }

    /// Creates a `SyncManager` using the policy from `config.sync`
    pub fn from_config(store: Arc<dyn IRemoteStore + Send + Sync>, config: &Config) -> Self {
        Self::new(store, config.sync.duplicate_titles)
    }

    /// The index used for identity resolution
    pub fn index(&self) -> &RemoteIndex {
        &self.index
    }

    /// Uploads `file` as a new remote object titled with its file name
    ///
    /// Does not check whether the title already exists remotely.
    ///
    /// # Errors
    /// - [`SyncError::LocalIo`] if the file cannot be read
    /// - [`SyncError::Transport`] if the insert fails
    #[instrument(skip(self, file), fields(title = %file.title()))]
    pub async fn add_file(&self, file: &LocalFile) -> Result<RemoteId, SyncError> {
        let content = read_local(file)?;
        let size = content.len();

        let id = self
            .store
            .insert(file.title(), content)
            .await
            .map_err(|e| SyncError::Transport(e.context("Failed to insert remote object")))?;

        info!(%id, size, "Added remote object");
        Ok(id)
    }

    /// Resolves `name` to a remote identifier
    ///
    /// Empty names and names with no match resolve to `None`. With several
    /// matches the index policy decides (first in listing order by default).
    pub async fn resolve_id(&self, name: &str) -> Result<Option<RemoteId>, SyncError> {
        self.index.lookup(name).await
    }

    /// Resolves `name` to every matching identifier, in listing order
    pub async fn resolve_all(&self, name: &str) -> Result<Vec<RemoteId>, SyncError> {
        self.index.lookup_all(name).await
    }

    /// Overwrites the remote content for `file`, creating the object if absent
    ///
    /// When a match exists its identifier and title are kept and only the
    /// content is replaced. Otherwise this behaves exactly like
    /// [`add_file`](Self::add_file).
    ///
    /// # Errors
    /// - [`SyncError::LocalIo`] if the file cannot be read
    /// - [`SyncError::Transport`] if the lookup, update or insert fails
    #[instrument(skip(self, file), fields(title = %file.title()))]
    pub async fn update_file(&self, file: &LocalFile) -> Result<RemoteId, SyncError> {
        let Some(id) = self.index.lookup(file.title().as_str()).await? else {
            debug!("No remote object yet, creating it");
            return self.add_file(file).await;
        };

        let content = read_local(file)?;
        let size = content.len();

        let updated = self
            .store
            .update(&id, content)
            .await
            .map_err(|e| SyncError::Transport(e.context("Failed to update remote object")))?;

        info!(id = %updated, size, "Updated remote object");
        Ok(updated)
    }

    /// Deletes the remote object matching `file`'s name
    ///
    /// Returns the identifier that was deleted.
    ///
    /// # Errors
    /// - [`SyncError::FileNotFound`] if no remote object has this title;
    ///   nothing is mutated in that case
    /// - [`SyncError::Transport`] if the lookup or delete fails
    #[instrument(skip(self, file), fields(title = %file.title()))]
    pub async fn delete_file(&self, file: &LocalFile) -> Result<RemoteId, SyncError> {
        let id = self
            .index
            .lookup(file.title().as_str())
            .await?
            .ok_or_else(|| SyncError::FileNotFound {
                title: file.title().clone(),
            })?;

        self.store
            .delete(&id)
            .await
            .map_err(|e| SyncError::Transport(e.context("Failed to delete remote object")))?;

        info!(%id, "Deleted remote object");
        Ok(id)
    }
}

/// Reads the whole local file; the handle is closed before returning
fn read_local(file: &LocalFile) -> Result<Vec<u8>, SyncError> {
    file.read_content().map_err(|source| SyncError::LocalIo {
        path: file.path().to_path_buf(),
        source,
    })
}

#[async_trait::async_trait]
impl IFileObserver for SyncManager {
    async fn on_created(&self, path: &Path) -> anyhow::Result<()> {
        let file = LocalFile::new(path)?;
        self.add_file(&file).await?;
        Ok(())
    }

    async fn on_modified(&self, path: &Path) -> anyhow::Result<()> {
        let file = LocalFile::new(path)?;
        self.update_file(&file).await?;
        Ok(())
    }

    async fn on_deleted(&self, path: &Path) -> anyhow::Result<()> {
        let file = LocalFile::new(path)?;
        self.delete_file(&file).await?;
        Ok(())
    }
}
