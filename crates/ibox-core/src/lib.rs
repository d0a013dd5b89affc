//! iBox Core - Domain types, ports and configuration
//!
//! This crate contains the hexagonal core shared by the sync engine and its
//! adapters:
//! - **Domain types** - `RemoteId`, `FileTitle`, `LocalFile`
//! - **Port definitions** - `IRemoteStore` (remote object store) and
//!   `IFileObserver` (filesystem event listener)
//! - **Configuration** - YAML-backed [`config::Config`]
//!
//! # Architecture
//!
//! The domain module has no knowledge of the remote service or of the OS
//! notification mechanism. Ports define the trait interfaces that adapter
//! crates (`ibox-drive`, `ibox-sync::watcher`) implement or drive.

pub mod config;
pub mod domain;
pub mod ports;
