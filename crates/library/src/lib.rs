#![allow(clippy::collapsible_if)]
pub mod config;
pub mod events;
pub mod repo;
pub mod snapshot;
pub mod watch;

pub use config::{ConfigError, LibraryConfig};
pub use events::RefreshEvent;
pub use repo::{
    CollectionRepo, MIN_REFRESH_INTERVAL, RefreshOutcome, RefreshReport, RefreshStatus, ScanSummary,
};
pub use snapshot::{EpisodeRef, SeasonRef, Snapshot};
pub use watch::{EpisodeWatch, NextUpError, WatchState, WatchStateStore, WatchStoreError, next_up};
