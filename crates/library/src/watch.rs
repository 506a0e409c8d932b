use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reelbase_core::{Episode, LibraryError, Show};
use serde::{Deserialize, Serialize};

/// Playback state of one episode for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeWatch {
    pub watched: bool,
    /// Resume position; zero when never started or finished.
    #[serde(default)]
    pub position: Duration,
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,
}

impl EpisodeWatch {
    pub fn watched() -> Self {
        Self {
            watched: true,
            ..Self::default()
        }
    }

    pub fn in_progress(position: Duration) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn played_at(self, at: DateTime<Utc>) -> Self {
        Self {
            last_played: Some(at),
            ..self
        }
    }

    /// Finished, or stopped somewhere in the middle.
    pub fn is_started(&self) -> bool {
        self.watched || !self.position.is_zero()
    }
}

/// Per-episode watch state of one user for one show, keyed by episode id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatchState {
    episodes: HashMap<String, EpisodeWatch>,
}

impl WatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, episode_id: impl Into<String>, watch: EpisodeWatch) -> &mut Self {
        self.episodes.insert(episode_id.into(), watch);
        self
    }

    pub fn get(&self, episode_id: &str) -> Option<&EpisodeWatch> {
        self.episodes.get(episode_id)
    }

    pub fn is_watched(&self, episode_id: &str) -> bool {
        self.get(episode_id).is_some_and(|w| w.watched)
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }
}

impl FromIterator<(String, EpisodeWatch)> for WatchState {
    fn from_iter<I: IntoIterator<Item = (String, EpisodeWatch)>>(iter: I) -> Self {
        Self {
            episodes: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("watch state store: {0}")]
pub struct WatchStoreError(pub String);

/// External playback-state store consulted by next-up queries.
#[async_trait]
pub trait WatchStateStore: Send + Sync {
    async fn get_watch_state(
        &self,
        user_id: &str,
        show_id: &str,
    ) -> Result<WatchState, WatchStoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NextUpError {
    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Store(#[from] WatchStoreError),
}

/// The episode a user should watch next.
///
/// The anchor is the most recently played episode with any state, or, when
/// the store keeps no play times, the furthest one in (season, episode)
/// order. An unfinished anchor is returned again; otherwise the first
/// unwatched episode after it. Specials are never considered, and a show
/// without history has no next episode.
pub fn next_up<'a>(show: &'a Show, state: &WatchState) -> Option<&'a Episode> {
    let mut episodes: Vec<&Episode> = show
        .seasons
        .iter()
        .filter(|s| !s.is_specials())
        .flat_map(|s| &s.episodes)
        .collect();
    episodes.sort_by_key(|e| (e.season_no, e.episode_no));

    let (anchor, watch) = episodes
        .iter()
        .enumerate()
        .filter_map(|(pos, e)| state.get(&e.id).filter(|w| w.is_started()).map(|w| (pos, w)))
        .max_by_key(|(pos, w)| (w.last_played, *pos))?;

    if !watch.watched {
        return Some(episodes[anchor]);
    }
    episodes[anchor + 1..]
        .iter()
        .find(|e| !state.is_watched(&e.id))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reelbase_core::{Artwork, Metadata, Season, Subtitles};

    fn episode(season_no: u32, episode_no: u32) -> Episode {
        Episode {
            id: format!("s{season_no}e{episode_no}"),
            name: format!("Episode {episode_no}"),
            sort_name: format!("episode {episode_no}"),
            season_no,
            episode_no,
            last_episode_no: None,
            file_name: format!("show.s{season_no:02}e{episode_no:02}.mkv"),
            file_size: 0,
            created: None,
            thumb: None,
            metadata: Metadata::default(),
            subtitles: Subtitles::default(),
        }
    }

    fn show(layout: &[(u32, u32)]) -> Show {
        Show {
            id: "show".into(),
            name: "Show".into(),
            sort_name: "show".into(),
            path: "Show".into(),
            artwork: Artwork::default(),
            season_all_poster: None,
            season_all_banner: None,
            first_video: None,
            last_video: None,
            metadata: Metadata::default(),
            seasons: layout
                .iter()
                .map(|&(season_no, count)| Season {
                    id: format!("s{season_no}"),
                    name: Season::display_name(season_no),
                    season_no,
                    poster: None,
                    banner: None,
                    fanart: None,
                    episodes: (1..=count).map(|no| episode(season_no, no)).collect(),
                })
                .collect(),
        }
    }

    fn next_id(show: &Show, state: &WatchState) -> Option<String> {
        next_up(show, state).map(|e| e.id.clone())
    }

    #[test]
    fn first_unwatched_after_last_watched() {
        let show = show(&[(1, 3), (2, 2)]);
        let mut state = WatchState::new();
        state
            .set("s1e1", EpisodeWatch::watched())
            .set("s1e2", EpisodeWatch::watched());
        assert_eq!(next_id(&show, &state), Some("s1e3".into()));
    }

    #[test]
    fn crosses_season_boundary() {
        let show = show(&[(1, 2), (2, 2)]);
        let state: WatchState = [("s1e2".to_string(), EpisodeWatch::watched())]
            .into_iter()
            .collect();
        assert_eq!(next_id(&show, &state), Some("s2e1".into()));
    }

    #[test]
    fn unfinished_episode_is_resumed() {
        let show = show(&[(1, 3)]);
        let mut state = WatchState::new();
        state
            .set("s1e1", EpisodeWatch::watched())
            .set("s1e2", EpisodeWatch::in_progress(Duration::from_secs(600)));
        assert_eq!(next_id(&show, &state), Some("s1e2".into()));
    }

    #[test]
    fn skips_episodes_already_watched_after_anchor() {
        let show = show(&[(1, 4)]);
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 2, 20, 0, 0).unwrap();
        let mut state = WatchState::new();
        state
            .set("s1e3", EpisodeWatch::watched().played_at(t0))
            .set("s1e1", EpisodeWatch::watched().played_at(t1));
        // s1e1 was rewatched last, s1e2 is the first gap after it
        assert_eq!(next_id(&show, &state), Some("s1e2".into()));
    }

    #[test]
    fn nothing_after_finale_or_without_history() {
        let show = show(&[(1, 2)]);
        assert_eq!(next_id(&show, &WatchState::new()), None);
        let mut state = WatchState::new();
        state.set("s1e2", EpisodeWatch::watched());
        assert_eq!(next_id(&show, &state), None);
    }

    #[test]
    fn specials_are_ignored() {
        let show = show(&[(0, 2), (1, 2)]);
        let mut state = WatchState::new();
        state.set("s0e1", EpisodeWatch::watched());
        assert_eq!(next_id(&show, &state), None);
        state.set("s1e1", EpisodeWatch::watched());
        assert_eq!(next_id(&show, &state), Some("s1e2".into()));
    }

    #[test]
    fn watch_state_deserializes_as_map() {
        let state: WatchState = serde_json::from_str(
            r#"{"s1e1":{"watched":true},"s1e2":{"watched":false,"position":{"secs":90,"nanos":0}}}"#,
        )
        .unwrap();
        assert_eq!(state.len(), 2);
        assert!(state.is_watched("s1e1"));
        assert!(state.get("s1e2").is_some_and(EpisodeWatch::is_started));
    }
}
