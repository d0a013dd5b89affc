//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the sync engine depends on; their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - List/insert/update/delete against the remote object store
//! - [`IFileObserver`] - Listener invoked by a filesystem event source

pub mod file_observer;
pub mod remote_store;

pub use file_observer::IFileObserver;
pub use remote_store::{IRemoteStore, ListPage, RemoteEntry};
