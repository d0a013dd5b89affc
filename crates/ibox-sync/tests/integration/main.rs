//! Integration tests for ibox-sync
//!
//! Drives the RemoteIndex, SyncManager and DirectoryWatcher against an
//! in-memory paginated remote store and real temporary directories.

mod common;

mod test_remote_index;
