use serde::Serialize;

/// Refresh lifecycle notifications, broadcast to every subscriber of the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum RefreshEvent {
    #[serde(rename = "refresh_started")]
    RefreshStarted { generation: u64 },
    /// One root could not be scanned; its previous contents stay published.
    #[serde(rename = "collection_failed")]
    CollectionFailed { collection_id: String, error: String },
    #[serde(rename = "refresh_completed")]
    RefreshCompleted { generation: u64, items: usize },
    #[serde(rename = "refresh_failed")]
    RefreshFailed { error: String },
}
