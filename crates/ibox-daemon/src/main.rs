//! iBox Daemon - Background synchronization service
//!
//! Watches one local directory and mirrors every file created, modified or
//! deleted in it to the remote store:
//! - Loads and validates the YAML configuration
//! - Reads the bearer token from the configured environment variable
//! - Dispatches filesystem events one at a time through the sync engine
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! ```text
//! DirectoryWatcher ──→ SyncManager ──→ DriveRemoteStore ──→ DriveClient
//! ```
//!
//! The watcher loop is controlled by a `CancellationToken` that is triggered
//! on receipt of SIGTERM or SIGINT.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use ibox_core::config::Config;
use ibox_core::ports::IRemoteStore;
use ibox_drive::{DriveClient, DriveRemoteStore};
use ibox_sync::{DirectoryWatcher, SyncManager};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Command line
// ============================================================================

/// Mirror a local directory to a remote file store
#[derive(Debug, Parser)]
#[command(name = "iboxd", version, about = "Mirror a local directory to a remote file store")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory to watch, overriding `sync.root`
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ============================================================================
// Startup helpers
// ============================================================================

/// Loads the configuration and applies command line overrides
///
/// An explicit `--config` must exist; the default path falls back to
/// built-in defaults when absent.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };

    if let Some(root) = &cli.root {
        config.sync.root = root.clone();
    }
    config.sync.root = expand_home(&config.sync.root);

    Ok(config)
}

/// Replaces a leading `~` with the user's home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Picks the log level: `-v` flags win over the configured level
fn effective_level(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Installs the global tracing subscriber
///
/// `RUST_LOG` overrides the computed level when set.
fn init_tracing(level: &str, json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("Failed to initialize tracing: {e}"))
}

/// Reads a non-empty bearer token from environment variable `var`
fn read_access_token(var: &str) -> Result<String> {
    let token = std::env::var(var)
        .with_context(|| format!("Environment variable {var} must hold an access token"))?;
    let token = token.trim();
    if token.is_empty() {
        bail!("Environment variable {var} is empty");
    }
    Ok(token.to_string())
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

/// Builds the adapters and runs the watcher until `shutdown` fires
async fn run(config: Config, access_token: String, shutdown: CancellationToken) -> Result<()> {
    let client = DriveClient::from_config(&config.remote, access_token);
    let store: Arc<dyn IRemoteStore + Send + Sync> = Arc::new(DriveRemoteStore::new(client));
    let manager = Arc::new(SyncManager::from_config(store, &config));

    let watcher = DirectoryWatcher::register_with(&config.sync.root, manager, &config.watcher)
        .context("Failed to start directory watcher")?;

    info!(
        root = %watcher.root().display(),
        remote = %config.remote.base_url,
        policy = ?config.sync.duplicate_titles,
        "iBox daemon ready"
    );

    watcher.run(shutdown).await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_tracing(
        &effective_level(cli.verbose, &config.logging.level),
        config.logging.json,
    )?;

    info!("iBox daemon starting (iboxd)");

    let errors = config.validate();
    if !errors.is_empty() {
        for err in &errors {
            error!(field = %err.field, "{}", err.message);
        }
        bail!("Invalid configuration ({} error(s))", errors.len());
    }

    let access_token = read_access_token(&config.remote.access_token_env)?;

    let shutdown_token = CancellationToken::new();

    // Spawn signal handler task
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let result = run(config, access_token, shutdown_token).await;

    match &result {
        Ok(()) => info!("iBox daemon shut down gracefully"),
        Err(e) => error!(error = %format!("{e:#}"), "iBox daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
