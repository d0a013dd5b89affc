//! Drive API HTTP client
//!
//! Wraps `reqwest::Client` with bearer authentication, base URL construction
//! and status classification into [`DriveError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ibox_drive::client::DriveClient;
//! use ibox_drive::listing;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new("access-token-here");
//! let page = listing::list_page(&client, None).await?;
//! println!("{} entries", page.entries.len());
//! # Ok(())
//! # }
//! ```

use ibox_core::config::RemoteConfig;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::DriveError;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

/// Default number of entries requested per listing page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default content type for uploaded file bodies
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// HTTP client for Drive API calls
#[derive(Clone)]
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests, without trailing slash
    base_url: String,
    /// Bearer token sent with every request
    access_token: String,
    /// `maxResults` for listing requests
    page_size: u32,
    /// Content type of uploaded bodies
    upload_content_type: String,
}

impl std::fmt::Debug for DriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveClient")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("page_size", &self.page_size)
            .field("upload_content_type", &self.upload_content_type)
            .finish()
    }
}

impl DriveClient {
    /// Creates a new DriveClient against the public API root
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL)
    }

    /// Creates a new DriveClient with a custom base URL (useful for testing)
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            page_size: DEFAULT_PAGE_SIZE,
            upload_content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    /// Creates a DriveClient from the `remote` configuration section
    pub fn from_config(config: &RemoteConfig, access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, config.base_url.clone())
            .with_page_size(config.page_size)
            .with_upload_content_type(config.upload_content_type.clone())
    }

    /// Sets `maxResults` for listing requests (at least 1)
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the content type used for uploaded bodies
    pub fn with_upload_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.upload_content_type = content_type.into();
        self
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn upload_content_type(&self) -> &str {
        &self.upload_content_type
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL (e.g., "/drive/v2/files")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Sends a request and classifies non-success statuses
    ///
    /// No retry is attempted.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, DriveError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = DriveError::from_status(status, &body);
        warn!(status = status.as_u16(), error = %err, "Drive API request failed");
        Err(err)
    }

    /// Sends a request and deserializes a JSON response body
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, DriveError> {
        let response = self.execute(request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| DriveError::InvalidResponse(e.to_string()))
    }
}
