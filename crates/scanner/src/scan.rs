use std::path::PathBuf;
use std::time::Instant;

use reelbase_core::{Collection, CollectionConfig, CollectionType, Item, LibraryError};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::movies;
use crate::shows;
use crate::walk::{DirListing, Visited};

/// Scan one collection root into a fresh `Collection`.
///
/// Blocking; run it on a blocking thread. Cancellation is checked before
/// each top-level directory.
pub fn scan_collection(
    cfg: &CollectionConfig,
    cancel: &CancellationToken,
) -> Result<ScanOutput, ScanError> {
    let started = Instant::now();
    let root = &cfg.directory;

    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(ScanError::NotADirectory(root.clone())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScanError::RootMissing(root.clone()));
        }
        Err(source) => {
            return Err(ScanError::Io {
                path: root.clone(),
                source,
            });
        }
    }

    let listing = DirListing::read(root).map_err(|source| ScanError::Io {
        path: root.clone(),
        source,
    })?;

    let mut visited = Visited::default();
    visited.enter(root);

    let mut collection = Collection::empty(cfg);
    let mut stats = ScanStats::default();

    for dir in &listing.subdirs {
        if cancel.is_cancelled() {
            info!(collection_id = %cfg.id, "scan cancelled");
            return Err(ScanError::Cancelled);
        }
        if !visited.enter(&dir.path) {
            stats.skipped_dirs += 1;
            continue;
        }
        stats.dirs_scanned += 1;

        let scanned = match cfg.collection_type {
            CollectionType::Movies => movies::scan_movie(&cfg.id, dir).map(|m| m.map(Item::Movie)),
            CollectionType::Shows => {
                shows::scan_show(&cfg.id, dir, &mut visited).map(|s| s.map(Item::Show))
            }
        };

        match scanned {
            Ok(Some(item)) => {
                if let Item::Show(show) = &item {
                    stats.episodes += show.episode_count();
                }
                collection.items.push(item);
            }
            Ok(None) => stats.skipped_dirs += 1,
            Err(e) => {
                warn!(path = %dir.path.display(), error = %e, "cannot read directory, skipping");
                stats.unreadable_dirs += 1;
            }
        }
    }

    if !listing.videos.is_empty() {
        debug!(
            collection_id = %cfg.id,
            files = listing.videos.len(),
            "ignoring videos directly in the collection root"
        );
    }

    stats.items = collection.items.len();
    stats.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        collection_id = %cfg.id,
        kind = %cfg.collection_type,
        items = stats.items,
        episodes = stats.episodes,
        skipped = stats.skipped_dirs,
        elapsed_ms = stats.elapsed_ms,
        "collection scanned"
    );

    Ok(ScanOutput { collection, stats })
}

// ─── Types ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ScanOutput {
    pub collection: Collection,
    pub stats: ScanStats,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub dirs_scanned: usize,
    pub items: usize,
    pub episodes: usize,
    /// Directories that held nothing recognizable, or were already visited.
    pub skipped_dirs: usize,
    pub unreadable_dirs: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("collection root {} does not exist", .0.display())]
    RootMissing(PathBuf),

    #[error("collection root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("scan cancelled")]
    Cancelled,
}

impl ScanError {
    pub fn into_library_error(self, collection_id: &str) -> LibraryError {
        match self {
            Self::Cancelled => LibraryError::Cancelled,
            other => LibraryError::ScanPartialFailure {
                collection_id: collection_id.to_string(),
                reason: other.to_string(),
            },
        }
    }
}
