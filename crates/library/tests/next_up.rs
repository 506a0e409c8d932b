use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reelbase_core::{CollectionConfig, CollectionType, LibraryError, Show};
use reelbase_library::{
    CollectionRepo, EpisodeWatch, LibraryConfig, NextUpError, WatchState, WatchStateStore,
    WatchStoreError,
};

#[derive(Default)]
struct MemoryStore {
    states: HashMap<(String, String), WatchState>,
}

#[async_trait]
impl WatchStateStore for MemoryStore {
    async fn get_watch_state(
        &self,
        user_id: &str,
        show_id: &str,
    ) -> Result<WatchState, WatchStoreError> {
        Ok(self
            .states
            .get(&(user_id.to_string(), show_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

struct OfflineStore;

#[async_trait]
impl WatchStateStore for OfflineStore {
    async fn get_watch_state(&self, _: &str, _: &str) -> Result<WatchState, WatchStoreError> {
        Err(WatchStoreError("connection refused".into()))
    }
}

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "v").unwrap();
}

/// Seasons 1 and 2 with three and two episodes.
async fn scanned_show() -> (tempfile::TempDir, CollectionRepo, Show) {
    let tmp = tempfile::tempdir().unwrap();
    for (season, episodes) in [(1, 3), (2, 2)] {
        for ep in 1..=episodes {
            touch(&tmp.path().join(format!(
                "Lost/Season {season}/lost.s{season:02}e{ep:02}.mkv"
            )));
        }
    }
    let repo = CollectionRepo::new(LibraryConfig::new(
        vec![CollectionConfig::new("tv", "TV", CollectionType::Shows, tmp.path())],
        Duration::from_secs(3600),
    ));
    repo.refresh().await.unwrap();
    let show = repo.snapshot().get_collections()[0].items[0]
        .as_item_ref()
        .as_show()
        .cloned()
        .expect("show scanned");
    (tmp, repo, show)
}

fn episode_id(show: &Show, season: u32, index: usize) -> String {
    show.season(season).unwrap().episodes[index].id.clone()
}

#[tokio::test]
async fn continues_after_last_watched_episode() {
    let (_tmp, repo, show) = scanned_show().await;
    let mut state = WatchState::new();
    state
        .set(episode_id(&show, 1, 0), EpisodeWatch::watched())
        .set(episode_id(&show, 1, 1), EpisodeWatch::watched());

    let snap = repo.snapshot();
    let next = snap.next_up(&show.id, &state).unwrap().unwrap();
    assert_eq!((next.season_no, next.episode_no), (1, 3));
}

#[tokio::test]
async fn resumes_through_the_store() {
    let (_tmp, repo, show) = scanned_show().await;
    let mut state = WatchState::new();
    state
        .set(episode_id(&show, 1, 2), EpisodeWatch::watched())
        .set(episode_id(&show, 2, 0), EpisodeWatch::in_progress(Duration::from_secs(300)));
    let mut store = MemoryStore::default();
    store.states.insert(("alice".into(), show.id.clone()), state);

    let next = repo.next_up_for_user(&store, "alice", &show.id).await.unwrap().unwrap();
    assert_eq!((next.season_no, next.episode_no), (2, 1));

    // no history for this user
    let none = repo.next_up_for_user(&store, "bob", &show.id).await.unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn unknown_show_and_store_failures() {
    let (_tmp, repo, show) = scanned_show().await;
    let err = repo
        .next_up_for_user(&MemoryStore::default(), "alice", "no-such-show")
        .await
        .unwrap_err();
    assert_eq!(err, NextUpError::Library(LibraryError::NotFound("no-such-show".into())));

    let err = repo.next_up_for_user(&OfflineStore, "alice", &show.id).await.unwrap_err();
    assert!(matches!(err, NextUpError::Store(_)));
}
