use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reelbase_core::{Collection, CollectionConfig, Episode, LibraryError};
use reelbase_scanner::{ScanError, ScanStats, scan_collection};
use tokio::sync::{Mutex, Notify, OwnedMutexGuard, broadcast};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::LibraryConfig;
use crate::events::RefreshEvent;
use crate::snapshot::Snapshot;
use crate::watch::{NextUpError, WatchStateStore};

const EVENT_CAPACITY: usize = 256;

/// Shortest period the background loop ticks at.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Owns the published snapshot and rebuilds it from the configured roots.
///
/// Readers call [`CollectionRepo::snapshot`] and never wait on a refresh.
/// A refresh builds the next generation off to the side and publishes it
/// with a single pointer swap.
pub struct CollectionRepo {
    config: LibraryConfig,
    current: ArcSwap<Snapshot>,
    /// Held for the whole of one refresh, by whichever thread is scanning.
    refresh_lock: Arc<Mutex<()>>,
    status: Arc<RwLock<RefreshStatus>>,
    trigger: Notify,
    events: broadcast::Sender<RefreshEvent>,
    cancel: CancellationToken,
}

/// Health view of the refresh cycle.
#[derive(Debug, Clone, Default)]
pub struct RefreshStatus {
    /// Generation of the published snapshot.
    pub generation: u64,
    pub in_progress: bool,
    /// End of the last refresh that published a snapshot.
    pub last_refresh: Option<DateTime<Utc>>,
    /// Most recent error of the last refresh, whole or per collection.
    pub last_error: Option<LibraryError>,
    pub last_report: Option<RefreshReport>,
}

#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub generation: u64,
    pub scanned: Vec<ScanSummary>,
    /// Roots that could not be scanned; their previous contents were kept.
    pub failures: Vec<LibraryError>,
    pub documents: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub collection_id: String,
    pub stats: ScanStats,
}

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Completed(RefreshReport),
    /// Another refresh was already running; this request was dropped.
    Coalesced,
}

/// Clears `in_progress` however the refresh ends.
struct InProgress(Arc<RwLock<RefreshStatus>>);

impl InProgress {
    fn start(status: Arc<RwLock<RefreshStatus>>) -> Self {
        status.write().in_progress = true;
        Self(status)
    }
}

impl Drop for InProgress {
    fn drop(&mut self) {
        self.0.write().in_progress = false;
    }
}

/// The right to run one refresh. It moves into the scanning thread, so it
/// is released when the scan ends even if the caller stopped waiting.
struct RefreshPermit {
    _lock: OwnedMutexGuard<()>,
    _in_progress: InProgress,
}

impl CollectionRepo {
    pub fn new(config: LibraryConfig) -> Self {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Repository whose refreshes and background loop stop when `cancel` fires.
    pub fn with_cancellation(mut config: LibraryConfig, cancel: CancellationToken) -> Self {
        for cfg in &mut config.collections {
            cfg.ensure_id();
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            current: ArcSwap::from_pointee(Snapshot::empty()),
            refresh_lock: Arc::new(Mutex::new(())),
            status: Arc::new(RwLock::new(RefreshStatus::default())),
            trigger: Notify::new(),
            events,
            cancel,
        }
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn status(&self) -> RefreshStatus {
        self.status.read().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.events.subscribe()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the background loop and abandon any refresh in flight.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Ask the background loop for a refresh now. Returns `false` when one
    /// is already running; the request is dropped, not queued.
    pub fn trigger_refresh(&self) -> bool {
        if self.status.read().in_progress {
            debug!("refresh already running, trigger ignored");
            return false;
        }
        self.trigger.notify_one();
        true
    }

    /// Rescan every configured root, rebuild the index and publish the result.
    ///
    /// A root that cannot be scanned keeps its previous contents (or stays
    /// empty before its first successful scan) and is listed in the report.
    /// On `IndexBuildFailure` or cancellation the published snapshot is left
    /// untouched.
    pub async fn refresh(&self) -> Result<RefreshOutcome, LibraryError> {
        let Ok(lock) = Arc::clone(&self.refresh_lock).try_lock_owned() else {
            debug!("refresh already running, coalescing");
            return Ok(RefreshOutcome::Coalesced);
        };
        let permit = RefreshPermit {
            _lock: lock,
            _in_progress: InProgress::start(Arc::clone(&self.status)),
        };

        let previous = self.current.load_full();
        let generation = previous.generation() + 1;
        info!(generation, collections = self.config.collections.len(), "refresh started");
        let _ = self.events.send(RefreshEvent::RefreshStarted { generation });

        let configs = self.config.collections.clone();
        let cancel = self.cancel.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let result = rebuild(&configs, &previous, generation, &cancel);
            (permit, result)
        })
        .await;
        // held until the snapshot is published
        let (_permit, built) = match joined {
            Ok((permit, result)) => (Some(permit), result),
            Err(e) => (
                None,
                Err(LibraryError::IndexBuildFailure(format!("refresh task failed: {e}"))),
            ),
        };
        let built = built.and_then(|built| {
            if self.cancel.is_cancelled() {
                Err(LibraryError::Cancelled)
            } else {
                Ok(built)
            }
        });

        match built {
            Ok((snapshot, report)) => {
                let documents = snapshot.document_count();
                self.current.store(Arc::new(snapshot));
                self.record_success(&report);

                for failure in &report.failures {
                    if let LibraryError::ScanPartialFailure { collection_id, .. } = failure {
                        let _ = self.events.send(RefreshEvent::CollectionFailed {
                            collection_id: collection_id.clone(),
                            error: failure.to_string(),
                        });
                    }
                }
                info!(
                    generation,
                    documents,
                    failed_collections = report.failures.len(),
                    elapsed_ms = report.elapsed_ms,
                    "snapshot published"
                );
                let _ = self.events.send(RefreshEvent::RefreshCompleted {
                    generation,
                    items: documents,
                });
                Ok(RefreshOutcome::Completed(report))
            }
            Err(err) => {
                match &err {
                    LibraryError::Cancelled => info!(generation, "refresh cancelled"),
                    _ => error!(generation, error = %err, "refresh failed, keeping previous snapshot"),
                }
                self.status.write().last_error = Some(err.clone());
                let _ = self.events.send(RefreshEvent::RefreshFailed {
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn record_success(&self, report: &RefreshReport) {
        let mut status = self.status.write();
        status.generation = report.generation;
        status.last_refresh = Some(Utc::now());
        status.last_error = report.failures.last().cloned();
        status.last_report = Some(report.clone());
    }

    /// Run refreshes on the configured interval, and whenever triggered,
    /// until the cancellation token fires. The first refresh runs immediately.
    /// Intervals below [`MIN_REFRESH_INTERVAL`] are raised to it.
    pub fn spawn_refresh_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let repo = Arc::clone(self);
        tokio::spawn(async move { repo.run_refresh_loop().await })
    }

    async fn run_refresh_loop(&self) {
        let period = self.config.refresh_interval.max(MIN_REFRESH_INTERVAL);
        if period != self.config.refresh_interval {
            let configured_ms =
                u64::try_from(self.config.refresh_interval.as_millis()).unwrap_or(u64::MAX);
            warn!(configured_ms, "refresh interval too short, using the minimum");
        }
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = period.as_secs(), "refresh loop started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
                _ = self.trigger.notified() => debug!("refresh triggered"),
            }
            if let Err(LibraryError::Cancelled) = self.refresh().await {
                break;
            }
        }

        info!("refresh loop stopped");
    }

    /// Next episode of a show for one user, with the watch state fetched
    /// from `store` and evaluated against the current snapshot.
    pub async fn next_up_for_user(
        &self,
        store: &dyn WatchStateStore,
        user_id: &str,
        show_id: &str,
    ) -> Result<Option<Episode>, NextUpError> {
        let state = store.get_watch_state(user_id, show_id).await?;
        let snapshot = self.snapshot();
        let next = snapshot.next_up(show_id, &state)?;
        Ok(next.cloned())
    }
}

/// Build the next generation from scratch. Runs on a blocking thread and
/// touches nothing readers can see.
fn rebuild(
    configs: &[CollectionConfig],
    previous: &Snapshot,
    generation: u64,
    cancel: &CancellationToken,
) -> Result<(Snapshot, RefreshReport), LibraryError> {
    let started = Instant::now();
    let mut report = RefreshReport {
        generation,
        ..RefreshReport::default()
    };
    let mut collections = Vec::with_capacity(configs.len());

    for cfg in configs {
        if cancel.is_cancelled() {
            return Err(LibraryError::Cancelled);
        }
        match scan_collection(cfg, cancel) {
            Ok(output) => {
                report.scanned.push(ScanSummary {
                    collection_id: cfg.id.clone(),
                    stats: output.stats,
                });
                collections.push(output.collection);
            }
            Err(ScanError::Cancelled) => return Err(LibraryError::Cancelled),
            Err(e) => {
                let err = e.into_library_error(&cfg.id);
                let kept = previous.get_collection(&cfg.id);
                warn!(
                    collection_id = %cfg.id,
                    error = %err,
                    kept_items = kept.map_or(0, |c| c.items.len()),
                    "collection scan failed, keeping previous contents"
                );
                collections.push(match kept {
                    Some(collection) => Collection {
                        name: cfg.name.clone(),
                        ..collection.clone()
                    },
                    None => Collection::empty(cfg),
                });
                report.failures.push(err);
            }
        }
    }

    if cancel.is_cancelled() {
        return Err(LibraryError::Cancelled);
    }
    let snapshot = Snapshot::build(generation, collections)?;
    report.documents = snapshot.document_count();
    report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    Ok((snapshot, report))
}
