use std::sync::Arc;

use anyhow::Context;
use reelbase_library::{CollectionRepo, LibraryConfig};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    if std::env::var("REELBASE_LOG_FORMAT").is_ok_and(|v| v == "json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = LibraryConfig::from_env().context("failed to load library configuration")?;
    if config.collections.is_empty() {
        warn!("no collections configured, set REELBASE_COLLECTIONS");
    }
    for cfg in &config.collections {
        info!(
            collection_id = %cfg.id,
            name = %cfg.name,
            kind = %cfg.collection_type,
            directory = %cfg.directory.display(),
            "collection configured"
        );
    }

    let repo = Arc::new(CollectionRepo::new(config));

    // Mirror refresh events into the log
    {
        let mut events = repo.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(json) => tracing::debug!(event = %json, "refresh event"),
                        Err(e) => warn!(error = %e, "failed to encode refresh event"),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "refresh event log lagging")
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    let refresh_loop = repo.spawn_refresh_loop();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown requested");
    repo.shutdown();
    refresh_loop.await.context("refresh loop panicked")?;

    let status = repo.status();
    info!(
        generation = status.generation,
        last_refresh = ?status.last_refresh,
        "stopped"
    );
    Ok(())
}
