//! Configuration module for iBox.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for iBox.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub watcher: WatcherConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory mirrored to the remote store (not recursive).
    pub root: PathBuf,
    /// How a name is resolved when several remote objects share it.
    pub duplicate_titles: DuplicateTitlePolicy,
}

/// Tie-break applied when several remote objects carry the same title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateTitlePolicy {
    /// First match in listing order; the listing stops at the match.
    #[default]
    FirstMatch,
    /// Last match in listing order; the whole listing is traversed.
    LastMatch,
}

/// Filesystem event source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Which notification mechanism to use.
    pub backend: WatcherBackend,
    /// Scan interval for the `poll` backend (milliseconds).
    pub poll_interval_ms: u64,
    /// Capacity of the channel between the OS watcher thread and the dispatcher.
    pub channel_capacity: usize,
}

/// Notification mechanism behind the directory watcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherBackend {
    /// OS-native notifications (inotify, kqueue, ...).
    #[default]
    Native,
    /// Periodic directory scans, for filesystems without native notifications.
    Poll,
}

/// Remote object store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the remote REST API.
    pub base_url: String,
    /// Maximum number of entries requested per listing page.
    pub page_size: u32,
    /// Content type sent with uploaded file content.
    pub upload_content_type: String,
    /// Environment variable holding the bearer access token.
    pub access_token_env: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/ibox/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("ibox")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("iBox"),
            duplicate_titles: DuplicateTitlePolicy::default(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            backend: WatcherBackend::default(),
            poll_interval_ms: 2000,
            channel_capacity: 1024,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com".to_string(),
            page_size: 100,
            upload_content_type: "application/octet-stream".to_string(),
            access_token_env: "IBOX_ACCESS_TOKEN".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"remote.page_size"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound the remote service accepts for `maxResults`.
const MAX_PAGE_SIZE: u32 = 1000;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        // Tilde paths are expanded at runtime, so only check concrete ones.
        let root_str = self.sync.root.to_string_lossy();
        if !root_str.starts_with('~') {
            if !self.sync.root.exists() {
                errors.push(ValidationError {
                    field: "sync.root".into(),
                    message: format!("directory does not exist: {}", self.sync.root.display()),
                });
            } else if !self.sync.root.is_dir() {
                errors.push(ValidationError {
                    field: "sync.root".into(),
                    message: format!("not a directory: {}", self.sync.root.display()),
                });
            }
        }

        // --- watcher ---
        if self.watcher.backend == WatcherBackend::Poll && self.watcher.poll_interval_ms == 0 {
            errors.push(ValidationError {
                field: "watcher.poll_interval_ms".into(),
                message: "must be greater than 0 when backend is poll".into(),
            });
        }
        if self.watcher.channel_capacity == 0 {
            errors.push(ValidationError {
                field: "watcher.channel_capacity".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- remote ---
        if !(self.remote.base_url.starts_with("http://")
            || self.remote.base_url.starts_with("https://"))
        {
            errors.push(ValidationError {
                field: "remote.base_url".into(),
                message: format!("must be an http(s) URL, got '{}'", self.remote.base_url),
            });
        }
        if self.remote.page_size == 0 || self.remote.page_size > MAX_PAGE_SIZE {
            errors.push(ValidationError {
                field: "remote.page_size".into(),
                message: format!("must be in range 1..={MAX_PAGE_SIZE}"),
            });
        }
        if self.remote.upload_content_type.trim().is_empty() {
            errors.push(ValidationError {
                field: "remote.upload_content_type".into(),
                message: "must not be empty".into(),
            });
        }
        if self.remote.access_token_env.trim().is_empty() {
            errors.push(ValidationError {
                field: "remote.access_token_env".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use ibox_core::config::{ConfigBuilder, DuplicateTitlePolicy};
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .sync_root(PathBuf::from("/home/user/iBox"))
///     .sync_duplicate_titles(DuplicateTitlePolicy::LastMatch)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder pre-populated with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_root(mut self, root: PathBuf) -> Self {
        self.config.sync.root = root;
        self
    }

    pub fn sync_duplicate_titles(mut self, policy: DuplicateTitlePolicy) -> Self {
        self.config.sync.duplicate_titles = policy;
        self
    }

    // --- watcher ---

    pub fn watcher_backend(mut self, backend: WatcherBackend) -> Self {
        self.config.watcher.backend = backend;
        self
    }

    pub fn watcher_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.watcher.poll_interval_ms = ms;
        self
    }

    pub fn watcher_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.watcher.channel_capacity = capacity;
        self
    }

    // --- remote ---

    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.base_url = url.into();
        self
    }

    pub fn remote_page_size(mut self, n: u32) -> Self {
        self.config.remote.page_size = n;
        self
    }

    pub fn remote_upload_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.config.remote.upload_content_type = content_type.into();
        self
    }

    pub fn remote_access_token_env(mut self, var: impl Into<String>) -> Self {
        self.config.remote.access_token_env = var.into();
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
