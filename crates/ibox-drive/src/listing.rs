//! File listing
//!
//! `GET /drive/v2/files?maxResults=N[&pageToken=T]` returns one page of file
//! resources plus an optional `nextPageToken`. Folders are dropped from the
//! page since only files are mirrored.

use anyhow::{Context, Result};
use ibox_core::domain::RemoteId;
use ibox_core::ports::{ListPage, RemoteEntry};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::DriveClient;
use crate::DriveError;

/// Listing endpoint
pub const FILES_PATH: &str = "/drive/v2/files";

/// MIME type the service assigns to folders
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A file resource as returned by the listing and upload endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileResource {
    /// Service-assigned identifier
    pub(crate) id: String,
    /// Title (not unique)
    #[serde(default)]
    pub(crate) title: String,
    /// MIME type, absent on some minimal responses
    #[serde(default)]
    pub(crate) mime_type: Option<String>,
}

impl FileResource {
    fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }

    /// Validates and returns the identifier
    pub(crate) fn remote_id(&self) -> Result<RemoteId, DriveError> {
        RemoteId::new(self.id.as_str())
            .map_err(|e| DriveError::InvalidResponse(format!("file resource id: {e}")))
    }
}

/// Response body of the listing endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    items: Vec<FileResource>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Fetches one page of the file listing
///
/// # Arguments
/// * `client` - The authenticated DriveClient
/// * `page_token` - Token from the previous page, `None` for the first page
///
/// # Errors
/// Returns an error if the request fails, the status is not a success, or the
/// body cannot be parsed
pub async fn list_page(client: &DriveClient, page_token: Option<&str>) -> Result<ListPage> {
    let max_results = client.page_size().to_string();
    let mut query: Vec<(&str, &str)> = vec![("maxResults", max_results.as_str())];
    if let Some(token) = page_token {
        query.push(("pageToken", token));
    }

    debug!(max_results = client.page_size(), has_token = page_token.is_some(), "Listing files");

    let list: FileList = client
        .execute_json(client.request(Method::GET, FILES_PATH).query(&query))
        .await
        .context("Failed to list files")?;

    into_page(list).context("Malformed file listing")
}

fn into_page(list: FileList) -> Result<ListPage, DriveError> {
    let total = list.items.len();
    let mut entries = Vec::with_capacity(total);

    for item in list.items {
        if item.is_folder() {
            continue;
        }
        let id = item.remote_id()?;
        entries.push(RemoteEntry {
            id,
            title: item.title,
        });
    }

    if entries.len() != total {
        debug!(skipped = total - entries.len(), "Dropped folders from listing page");
    }

    let next_page_token = match list.next_page_token {
        Some(token) if token.is_empty() => {
            warn!("Listing returned an empty page token, treating as last page");
            None
        }
        other => other,
    };

    Ok(ListPage {
        entries,
        next_page_token,
    })
}
