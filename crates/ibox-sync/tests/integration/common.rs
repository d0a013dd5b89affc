//! Shared test helpers for sync engine integration tests
//!
//! Provides an in-memory [`IRemoteStore`] that paginates its listing in
//! insertion order, counts calls per primitive and can be told to fail, plus
//! a recording [`IFileObserver`] for watcher tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail};
use ibox_core::config::DuplicateTitlePolicy;
use ibox_core::domain::{FileTitle, LocalFile, RemoteId};
use ibox_core::ports::{IFileObserver, IRemoteStore, ListPage, RemoteEntry};
use ibox_sync::SyncManager;
use tokio::sync::mpsc;

// ============================================================================
// In-memory remote store
// ============================================================================

/// An object held by [`InMemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub id: RemoteId,
    pub title: String,
    pub content: Vec<u8>,
}

/// Number of calls received per primitive
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub insert: usize,
    pub update: usize,
    pub delete: usize,
}

impl CallCounts {
    /// Total number of mutating calls
    pub fn mutations(&self) -> usize {
        self.insert + self.update + self.delete
    }
}

#[derive(Default)]
struct State {
    objects: Vec<StoredObject>,
    next_id: u64,
    calls: CallCounts,
    fail_list_after: Option<usize>,
    fail_insert: bool,
    fail_update: bool,
    fail_delete: bool,
}

/// Remote store double listing objects in insertion order
pub struct InMemoryStore {
    page_size: usize,
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            state: Mutex::new(State::default()),
        }
    }

    /// Adds an object directly, bypassing call counting
    pub fn seed(&self, title: &str, content: &[u8]) -> RemoteId {
        let mut state = self.state.lock().unwrap();
        push_object(&mut state, title, content.to_vec())
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.state.lock().unwrap().objects.clone()
    }

    pub fn object(&self, id: &RemoteId) -> Option<StoredObject> {
        self.state
            .lock()
            .unwrap()
            .objects
            .iter()
            .find(|o| &o.id == id)
            .cloned()
    }

    pub fn ids_titled(&self, title: &str) -> Vec<RemoteId> {
        self.state
            .lock()
            .unwrap()
            .objects
            .iter()
            .filter(|o| o.title == title)
            .map(|o| o.id.clone())
            .collect()
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().unwrap().calls
    }

    pub fn reset_calls(&self) {
        self.state.lock().unwrap().calls = CallCounts::default();
    }

    /// Makes every `list` call fail once `n` calls have succeeded
    pub fn fail_list_after(&self, n: usize) {
        self.state.lock().unwrap().fail_list_after = Some(n);
    }

    pub fn fail_inserts(&self) {
        self.state.lock().unwrap().fail_insert = true;
    }

    pub fn fail_updates(&self) {
        self.state.lock().unwrap().fail_update = true;
    }

    pub fn fail_deletes(&self) {
        self.state.lock().unwrap().fail_delete = true;
    }
}

fn push_object(state: &mut State, title: &str, content: Vec<u8>) -> RemoteId {
    state.next_id += 1;
    let id = RemoteId::new(format!("obj-{:04}", state.next_id)).unwrap();
    state.objects.push(StoredObject {
        id: id.clone(),
        title: title.to_string(),
        content,
    });
    id
}

#[async_trait::async_trait]
impl IRemoteStore for InMemoryStore {
    async fn list(&self, page_token: Option<&str>) -> anyhow::Result<ListPage> {
        let mut state = self.state.lock().unwrap();
        if let Some(limit) = state.fail_list_after {
            if state.calls.list >= limit {
                bail!("simulated listing failure");
            }
        }
        state.calls.list += 1;

        let offset = match page_token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| anyhow!("bad page token: {token}"))?,
        };

        let end = (offset + self.page_size).min(state.objects.len());
        let entries = state
            .objects
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|o| RemoteEntry {
                id: o.id.clone(),
                title: o.title.clone(),
            })
            .collect();
        let next_page_token = (end < state.objects.len()).then(|| format!("page-{end}"));

        Ok(ListPage {
            entries,
            next_page_token,
        })
    }

    async fn insert(&self, title: &FileTitle, content: Vec<u8>) -> anyhow::Result<RemoteId> {
        let mut state = self.state.lock().unwrap();
        state.calls.insert += 1;
        if state.fail_insert {
            bail!("simulated insert failure");
        }
        Ok(push_object(&mut state, title.as_str(), content))
    }

    async fn update(&self, id: &RemoteId, content: Vec<u8>) -> anyhow::Result<RemoteId> {
        let mut state = self.state.lock().unwrap();
        state.calls.update += 1;
        if state.fail_update {
            bail!("simulated update failure");
        }
        let object = state
            .objects
            .iter_mut()
            .find(|o| &o.id == id)
            .ok_or_else(|| anyhow!("no object {id}"))?;
        object.content = content;
        Ok(object.id.clone())
    }

    async fn delete(&self, id: &RemoteId) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.delete += 1;
        if state.fail_delete {
            bail!("simulated delete failure");
        }
        let before = state.objects.len();
        state.objects.retain(|o| &o.id != id);
        if state.objects.len() == before {
            bail!("no object {id}");
        }
        Ok(())
    }
}

/// Builds a store and a manager sharing it
pub fn setup_manager(
    page_size: usize,
    policy: DuplicateTitlePolicy,
) -> (Arc<InMemoryStore>, SyncManager) {
    let store = Arc::new(InMemoryStore::new(page_size));
    let manager = SyncManager::new(store.clone(), policy);
    (store, manager)
}

/// Writes `content` to `dir/name` and returns it as a `LocalFile`
pub fn write_local(dir: &Path, name: &str, content: &[u8]) -> LocalFile {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    LocalFile::new(path).unwrap()
}

// ============================================================================
// Recording listener
// ============================================================================

/// Event observed by [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
}

impl Observed {
    pub fn file_name(&self) -> String {
        let path = match self {
            Observed::Created(p) | Observed::Modified(p) | Observed::Deleted(p) => p,
        };
        path.file_name().unwrap().to_string_lossy().into_owned()
    }
}

/// Listener forwarding every call to a channel
///
/// Optionally sleeps inside each call so tests can check that dispatch never
/// overlaps.
pub struct RecordingObserver {
    tx: mpsc::UnboundedSender<Observed>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail: bool,
}

impl RecordingObserver {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Observed>) {
        Self::build(Duration::ZERO, false)
    }

    pub fn with_delay(delay: Duration) -> (Arc<Self>, mpsc::UnboundedReceiver<Observed>) {
        Self::build(delay, false)
    }

    /// Records every call and then reports failure
    pub fn failing() -> (Arc<Self>, mpsc::UnboundedReceiver<Observed>) {
        Self::build(Duration::ZERO, true)
    }

    fn build(delay: Duration, fail: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<Observed>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let observer = Arc::new(Self {
            tx,
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fail,
        });
        (observer, rx)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn record(&self, observed: Observed) -> anyhow::Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let _ = self.tx.send(observed);
        if self.fail {
            bail!("simulated listener failure");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl IFileObserver for RecordingObserver {
    async fn on_created(&self, path: &Path) -> anyhow::Result<()> {
        self.record(Observed::Created(path.to_path_buf())).await
    }

    async fn on_modified(&self, path: &Path) -> anyhow::Result<()> {
        self.record(Observed::Modified(path.to_path_buf())).await
    }

    async fn on_deleted(&self, path: &Path) -> anyhow::Result<()> {
        self.record(Observed::Deleted(path.to_path_buf())).await
    }
}

/// Receives events until one satisfies `pred` or `timeout` elapses
pub async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<Observed>,
    timeout: Duration,
    mut pred: impl FnMut(&Observed) -> bool,
) -> Option<Observed> {
    tokio::time::timeout(timeout, async {
        while let Some(observed) = rx.recv().await {
            if pred(&observed) {
                return Some(observed);
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}
