//! Remote object store port (driven/secondary port)
//!
//! The remote service indexes objects by an opaque identifier and carries a
//! human-readable title that is **not** unique. It exposes four primitives:
//! a paginated listing plus insert, update and delete.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific; the engine classifies every port failure as a
//!   transport failure.
//! - Implementations must not retry internally; retry policy belongs to the
//!   caller of the engine.
//! - `ListPage` and `RemoteEntry` are port-level DTOs carrying only what
//!   identity resolution needs.

use crate::domain::newtypes::{FileTitle, RemoteId};

/// One object in a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Identifier assigned by the remote service
    pub id: RemoteId,
    /// Title of the object (may be shared with other objects)
    pub title: String,
}

/// A single page of the remote listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Entries in service listing order
    pub entries: Vec<RemoteEntry>,
    /// Token for the next page (None on the last page)
    pub next_page_token: Option<String>,
}

impl ListPage {
    /// Returns true if more pages follow this one
    pub fn has_more(&self) -> bool {
        self.next_page_token.is_some()
    }
}

/// Port trait for the remote object store
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Fetches one page of the listing
    ///
    /// # Arguments
    /// * `page_token` - Token from the previous page, `None` for the first page
    async fn list(&self, page_token: Option<&str>) -> anyhow::Result<ListPage>;

    /// Creates a new object and returns its identifier
    ///
    /// No uniqueness check is made on `title`.
    async fn insert(&self, title: &FileTitle, content: Vec<u8>) -> anyhow::Result<RemoteId>;

    /// Replaces the content of an existing object, keeping its title
    ///
    /// Returns the identifier reported by the service (the same object).
    async fn update(&self, id: &RemoteId, content: Vec<u8>) -> anyhow::Result<RemoteId>;

    /// Removes an object by identifier
    async fn delete(&self, id: &RemoteId) -> anyhow::Result<()>;
}
