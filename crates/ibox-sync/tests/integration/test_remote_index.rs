//! Integration tests for paginated title resolution

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use ibox_core::config::DuplicateTitlePolicy;
use ibox_core::domain::{FileTitle, RemoteId};
use ibox_core::ports::{IRemoteStore, ListPage, RemoteEntry};
use ibox_sync::{RemoteIndex, SyncError};

use crate::common::InMemoryStore;

fn index_over(store: &Arc<InMemoryStore>, policy: DuplicateTitlePolicy) -> RemoteIndex {
    RemoteIndex::new(store.clone(), policy)
}

#[tokio::test]
async fn test_empty_name_resolves_without_listing() {
    let store = Arc::new(InMemoryStore::new(10));
    store.seed("a.txt", b"a");
    let index = index_over(&store, DuplicateTitlePolicy::FirstMatch);

    assert_eq!(index.lookup("").await.unwrap(), None);
    assert!(index.lookup_all("").await.unwrap().is_empty());
    assert_eq!(store.calls().list, 0);
}

#[tokio::test]
async fn test_unknown_name_walks_every_page() {
    let store = Arc::new(InMemoryStore::new(2));
    for i in 0..5 {
        store.seed(&format!("file-{i}.txt"), b"x");
    }
    let index = index_over(&store, DuplicateTitlePolicy::FirstMatch);

    assert_eq!(index.lookup("missing.txt").await.unwrap(), None);
    // 5 objects at 2 per page
    assert_eq!(store.calls().list, 3);
}

#[tokio::test]
async fn test_empty_listing_is_not_found() {
    let store = Arc::new(InMemoryStore::new(10));
    let index = index_over(&store, DuplicateTitlePolicy::FirstMatch);

    assert_eq!(index.lookup("a.txt").await.unwrap(), None);
    assert_eq!(store.calls().list, 1);
}

#[tokio::test]
async fn test_match_on_later_page() {
    let store = Arc::new(InMemoryStore::new(2));
    store.seed("a.txt", b"a");
    store.seed("b.txt", b"b");
    store.seed("c.txt", b"c");
    let target = store.seed("d.txt", b"d");
    store.seed("e.txt", b"e");
    let index = index_over(&store, DuplicateTitlePolicy::FirstMatch);

    assert_eq!(index.lookup("d.txt").await.unwrap(), Some(target));
    // stops on the page holding the match
    assert_eq!(store.calls().list, 2);
}

#[tokio::test]
async fn test_title_match_is_exact() {
    let store = Arc::new(InMemoryStore::new(10));
    store.seed("Report.txt", b"x");
    store.seed("report.txt.bak", b"x");
    let index = index_over(&store, DuplicateTitlePolicy::FirstMatch);

    assert_eq!(index.lookup("report.txt").await.unwrap(), None);
}

#[tokio::test]
async fn test_first_match_wins_by_default() {
    let store = Arc::new(InMemoryStore::new(1));
    let first = store.seed("dup.txt", b"one");
    store.seed("other.txt", b"x");
    store.seed("dup.txt", b"two");
    let index = index_over(&store, DuplicateTitlePolicy::default());

    assert_eq!(index.policy(), DuplicateTitlePolicy::FirstMatch);
    assert_eq!(index.lookup("dup.txt").await.unwrap(), Some(first));
    assert_eq!(store.calls().list, 1);
}

#[tokio::test]
async fn test_last_match_policy_walks_whole_listing() {
    let store = Arc::new(InMemoryStore::new(1));
    store.seed("dup.txt", b"one");
    store.seed("other.txt", b"x");
    let last = store.seed("dup.txt", b"two");
    let index = index_over(&store, DuplicateTitlePolicy::LastMatch);

    assert_eq!(index.lookup("dup.txt").await.unwrap(), Some(last));
    assert_eq!(store.calls().list, 3);
}

#[tokio::test]
async fn test_lookup_all_returns_matches_in_listing_order() {
    let store = Arc::new(InMemoryStore::new(2));
    let a = store.seed("dup.txt", b"1");
    store.seed("x.txt", b"x");
    let b = store.seed("dup.txt", b"2");
    store.seed("y.txt", b"y");
    let c = store.seed("dup.txt", b"3");
    let index = index_over(&store, DuplicateTitlePolicy::FirstMatch);

    assert_eq!(index.lookup_all("dup.txt").await.unwrap(), vec![a, b, c]);
    assert!(index.lookup_all("none.txt").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failure_mid_listing_is_transport_error() {
    let store = Arc::new(InMemoryStore::new(2));
    for i in 0..6 {
        store.seed(&format!("file-{i}.txt"), b"x");
    }
    // second page fails
    store.fail_list_after(1);
    let index = index_over(&store, DuplicateTitlePolicy::FirstMatch);

    let err = index.lookup("missing.txt").await.unwrap_err();
    assert!(err.is_transport(), "expected transport error, got {err:?}");
    assert!(err.to_string().contains("Failed to fetch remote listing page"));
}

#[tokio::test]
async fn test_failure_on_first_page_is_not_reported_as_missing() {
    let store = Arc::new(InMemoryStore::new(2));
    store.seed("a.txt", b"a");
    store.fail_list_after(0);
    let index = index_over(&store, DuplicateTitlePolicy::FirstMatch);

    assert!(matches!(
        index.lookup("a.txt").await,
        Err(SyncError::Transport(_))
    ));
    assert!(matches!(
        index.lookup_all("a.txt").await,
        Err(SyncError::Transport(_))
    ));
}

/// Listing whose page tokens go A -> B -> A -> ... without ever ending
struct CyclingStore {
    lists: AtomicUsize,
}

#[async_trait::async_trait]
impl IRemoteStore for CyclingStore {
    async fn list(&self, page_token: Option<&str>) -> anyhow::Result<ListPage> {
        let n = self.lists.fetch_add(1, Ordering::SeqCst);
        if n > 50 {
            bail!("listing was not abandoned");
        }
        let next = match page_token {
            None | Some("B") => "A",
            Some(_) => "B",
        };
        Ok(ListPage {
            entries: vec![RemoteEntry {
                id: RemoteId::new(format!("obj-{n}")).unwrap(),
                title: "other.txt".to_string(),
            }],
            next_page_token: Some(next.to_string()),
        })
    }

    async fn insert(&self, _title: &FileTitle, _content: Vec<u8>) -> anyhow::Result<RemoteId> {
        bail!("not used")
    }

    async fn update(&self, _id: &RemoteId, _content: Vec<u8>) -> anyhow::Result<RemoteId> {
        bail!("not used")
    }

    async fn delete(&self, _id: &RemoteId) -> anyhow::Result<()> {
        bail!("not used")
    }
}

#[tokio::test]
async fn test_cycling_page_tokens_fail_as_transport_error() {
    let store = Arc::new(CyclingStore {
        lists: AtomicUsize::new(0),
    });
    let index = RemoteIndex::new(store.clone(), DuplicateTitlePolicy::FirstMatch);

    let err = tokio::time::timeout(Duration::from_secs(5), index.lookup("missing.txt"))
        .await
        .expect("lookup should not loop forever")
        .unwrap_err();
    assert!(err.is_transport(), "expected transport error, got {err:?}");
    assert!(err.to_string().contains("revisited page token A"));
    // pages: first, A, B, then A again
    assert_eq!(store.lists.load(Ordering::SeqCst), 3);
}
