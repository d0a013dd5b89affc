//! Remote identity resolution
//!
//! The remote store indexes objects by identifier, not by name, and does not
//! enforce unique titles. [`RemoteIndex`] maps a local file name to an
//! identifier by walking the remote listing page by page.
//!
//! ## Resolution policy
//!
//! - An empty name resolves to `None` without contacting the service.
//! - [`DuplicateTitlePolicy::FirstMatch`] (default) returns the first entry
//!   whose title equals the name, in the order the service lists them, and
//!   stops fetching pages at that point. This is only as deterministic as the
//!   service's listing order; it is not "most recent".
//! - [`DuplicateTitlePolicy::LastMatch`] walks the whole listing and returns
//!   the last match.
//! - [`RemoteIndex::lookup_all`] returns every match, for callers that want
//!   to report duplicates.
//!
//! Every page is fetched through the port; a failure on any page fails the
//! whole lookup. Nothing is cached between lookups because the service has
//! no change feed to invalidate a cache with.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::anyhow;
use ibox_core::config::DuplicateTitlePolicy;
use ibox_core::domain::RemoteId;
use ibox_core::ports::{IRemoteStore, ListPage};
use tracing::{debug, instrument, warn};

use crate::SyncError;

/// Resolves remote titles to identifiers
pub struct RemoteIndex {
    /// Remote object store
    store: Arc<dyn IRemoteStore + Send + Sync>,
    /// Tie-break for titles shared by several objects
    policy: DuplicateTitlePolicy,
}

impl RemoteIndex {
    /// Creates a `RemoteIndex` over the given store
    pub fn new(store: Arc<dyn IRemoteStore + Send + Sync>, policy: DuplicateTitlePolicy) -> Self {
        Self { store, policy }
    }

    /// Returns the configured tie-break policy
    pub fn policy(&self) -> DuplicateTitlePolicy {
        self.policy
    }

    /// Finds the identifier of the object titled `name`
    ///
    /// Returns `Ok(None)` when `name` is empty or nothing matches.
    ///
    /// # Errors
    /// Returns [`SyncError::Transport`] if any listing page cannot be fetched
    #[instrument(skip(self), fields(policy = ?self.policy))]
    pub async fn lookup(&self, name: &str) -> Result<Option<RemoteId>, SyncError> {
        if name.is_empty() {
            debug!("Empty name, skipping remote lookup");
            return Ok(None);
        }

        let found = match self.policy {
            DuplicateTitlePolicy::FirstMatch => self.scan(name, true).await?.into_iter().next(),
            DuplicateTitlePolicy::LastMatch => {
                let mut matches = self.scan(name, false).await?;
                if matches.len() > 1 {
                    warn!(
                        name,
                        count = matches.len(),
                        "Several remote objects share this title, using the last one"
                    );
                }
                matches.pop()
            }
        };

        match &found {
            Some(id) => debug!(%id, "Resolved remote identifier"),
            None => debug!("No remote object with this title"),
        }
        Ok(found)
    }

    /// Returns the identifiers of every object titled `name`, in listing order
    ///
    /// # Errors
    /// Returns [`SyncError::Transport`] if any listing page cannot be fetched
    #[instrument(skip(self))]
    pub async fn lookup_all(&self, name: &str) -> Result<Vec<RemoteId>, SyncError> {
        if name.is_empty() {
            return Ok(Vec::new());
        }
        let matches = self.scan(name, false).await?;
        debug!(count = matches.len(), "Collected matching remote objects");
        Ok(matches)
    }

    /// Walks the listing collecting identifiers whose title equals `name`
    async fn scan(&self, name: &str, stop_at_first: bool) -> Result<Vec<RemoteId>, SyncError> {
        let mut matches = Vec::new();
        let mut token: Option<String> = None;
        let mut seen_tokens: HashSet<String> = HashSet::new();
        let mut page_count: u32 = 0;

        loop {
            let page = self.fetch_page(token.as_deref()).await?;
            page_count += 1;

            debug!(
                page = page_count,
                entries = page.entries.len(),
                has_next = page.has_more(),
                "Received listing page"
            );

            for entry in page.entries {
                if entry.title == name {
                    matches.push(entry.id);
                    if stop_at_first {
                        return Ok(matches);
                    }
                }
            }

            match page.next_page_token {
                Some(next) => {
                    if !seen_tokens.insert(next.clone()) {
                        return Err(SyncError::Transport(anyhow!(
                            "Listing revisited page token {next} after {page_count} pages"
                        )));
                    }
                    token = Some(next);
                }
                None => break,
            }
        }

        debug!(pages = page_count, "Listing exhausted");
        Ok(matches)
    }

    async fn fetch_page(&self, token: Option<&str>) -> Result<ListPage, SyncError> {
        self.store
            .list(token)
            .await
            .map_err(|e| SyncError::Transport(e.context("Failed to fetch remote listing page")))
    }
}
