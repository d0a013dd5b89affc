//! DriveRemoteStore - IRemoteStore implementation over the Drive API
//!
//! Delegates to the [`listing`] and [`upload`] modules; `delete` makes a
//! direct call through [`DriveClient::request`].
//!
//! ## Design Notes
//!
//! - The client is immutable once built, so no lock is needed around it.
//! - Errors leave this adapter as `anyhow::Error` wrapping [`DriveError`](crate::DriveError);
//!   the sync engine reports all of them as transport failures.

use anyhow::{Context, Result};
use ibox_core::domain::{FileTitle, RemoteId};
use ibox_core::ports::{IRemoteStore, ListPage};
use reqwest::Method;
use tracing::{debug, instrument};

use crate::client::DriveClient;
use crate::listing::{self, FILES_PATH};
use crate::upload;

/// Remote store backed by the Drive REST API
#[derive(Debug, Clone)]
pub struct DriveRemoteStore {
    client: DriveClient,
}

impl DriveRemoteStore {
    pub fn new(client: DriveClient) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying client
    pub fn client(&self) -> &DriveClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl IRemoteStore for DriveRemoteStore {
    async fn list(&self, page_token: Option<&str>) -> Result<ListPage> {
        listing::list_page(&self.client, page_token).await
    }

    #[instrument(skip(self, content), fields(size = content.len()))]
    async fn insert(&self, title: &FileTitle, content: Vec<u8>) -> Result<RemoteId> {
        upload::insert_file(&self.client, title, &content).await
    }

    #[instrument(skip(self, content), fields(size = content.len()))]
    async fn update(&self, id: &RemoteId, content: Vec<u8>) -> Result<RemoteId> {
        upload::update_file(&self.client, id, &content).await
    }

    /// Deletes a file permanently
    ///
    /// Makes `DELETE /drive/v2/files/{id}`; the service answers 204.
    #[instrument(skip(self))]
    async fn delete(&self, id: &RemoteId) -> Result<()> {
        let path = format!("{}/{}", FILES_PATH, id.as_str());

        self.client
            .execute(self.client.request(Method::DELETE, &path))
            .await
            .with_context(|| format!("Failed to delete file {id}"))?;

        debug!("File deleted");
        Ok(())
    }
}
