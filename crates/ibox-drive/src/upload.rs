//! Upload operations
//!
//! - [`insert_file`] - Creates a file with metadata and content in one
//!   `multipart/related` request, so a failed insert never leaves an empty
//!   titled object behind
//! - [`update_file`] - Replaces the content of an existing file with a
//!   `media` upload; metadata (including the title) is left untouched

use anyhow::{Context, Result};
use ibox_core::domain::{FileTitle, RemoteId};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use crate::client::DriveClient;
use crate::listing::FileResource;

/// Upload endpoint for new files
pub const UPLOAD_PATH: &str = "/upload/drive/v2/files";

/// Builds the upload path for an existing file
fn media_path(id: &RemoteId) -> String {
    format!("{}/{}", UPLOAD_PATH, id.as_str())
}

// ============================================================================
// multipart/related body
// ============================================================================

/// A `multipart/related` body: JSON metadata part followed by the content part
struct RelatedBody {
    boundary: String,
    bytes: Vec<u8>,
}

impl RelatedBody {
    fn new(metadata: &serde_json::Value, content_type: &str, content: &[u8]) -> Self {
        let boundary = pick_boundary(content);
        let metadata = metadata.to_string();

        let mut bytes = Vec::with_capacity(content.len() + metadata.len() + 256);
        bytes.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        bytes.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        bytes.extend_from_slice(metadata.as_bytes());
        bytes.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
        bytes.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        bytes.extend_from_slice(content);
        bytes.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Self { boundary, bytes }
    }

    fn content_type(&self) -> String {
        format!("multipart/related; boundary={}", self.boundary)
    }
}

/// Picks a boundary that does not occur in `content`
fn pick_boundary(content: &[u8]) -> String {
    loop {
        let boundary = format!("ibox_{}", Uuid::new_v4().simple());
        if !contains(content, boundary.as_bytes()) {
            return boundary;
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

// ============================================================================
// insert_file
// ============================================================================

/// Creates a new file titled `title` holding `content`
///
/// Uses `POST /upload/drive/v2/files?uploadType=multipart`. No uniqueness
/// check is made on the title.
///
/// # Returns
/// The identifier assigned by the service
///
/// # Errors
/// Returns an error if the request fails or the response lacks a valid id
pub async fn insert_file(
    client: &DriveClient,
    title: &FileTitle,
    content: &[u8],
) -> Result<RemoteId> {
    let metadata = serde_json::json!({ "title": title.as_str() });
    let body = RelatedBody::new(&metadata, client.upload_content_type(), content);
    debug!(%title, size = content.len(), "Inserting file");

    let request = client
        .request(Method::POST, UPLOAD_PATH)
        .query(&[("uploadType", "multipart")])
        .header(CONTENT_TYPE, body.content_type())
        .body(body.bytes);

    let created: FileResource = client
        .execute_json(request)
        .await
        .context("Failed to insert file")?;

    let id = created.remote_id().context("Insert response without a file id")?;
    debug!(%id, %title, "Insert completed");
    Ok(id)
}

// ============================================================================
// update_file
// ============================================================================

/// Replaces the content of file `id` with `content`
///
/// Uses `PUT /upload/drive/v2/files/{id}?uploadType=media`.
///
/// # Returns
/// The identifier reported by the service (the same file)
///
/// # Errors
/// Returns an error if the request fails (including a 404 for an unknown id)
/// or the response lacks a valid id
pub async fn update_file(client: &DriveClient, id: &RemoteId, content: &[u8]) -> Result<RemoteId> {
    debug!(%id, size = content.len(), "Updating file content");

    let request = client
        .request(Method::PUT, &media_path(id))
        .query(&[("uploadType", "media")])
        .header(CONTENT_TYPE, client.upload_content_type())
        .body(content.to_vec());

    let updated: FileResource = client
        .execute_json(request)
        .await
        .with_context(|| format!("Failed to update file {id}"))?;

    let updated_id = updated
        .remote_id()
        .context("Update response without a file id")?;
    debug!(id = %updated_id, "Update completed");
    Ok(updated_id)
}
