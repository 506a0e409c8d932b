use thiserror::Error;

/// Error taxonomy of the indexing engine.
///
/// Only `IndexBuildFailure` and `Cancelled` ever fail a refresh as a whole;
/// the other variants are reported and recovered from locally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LibraryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("scan of collection {collection_id} failed: {reason}")]
    ScanPartialFailure {
        collection_id: String,
        reason: String,
    },

    #[error("search index build failed: {0}")]
    IndexBuildFailure(String),

    #[error("malformed metadata in {path}: {reason}")]
    MalformedMetadata { path: String, reason: String },

    #[error("refresh cancelled")]
    Cancelled,
}

impl LibraryError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::ScanPartialFailure { .. } => "scan_partial_failure",
            Self::IndexBuildFailure(_) => "index_build_failure",
            Self::MalformedMetadata { .. } => "malformed_metadata",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the engine keeps serving from its previous snapshot after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::IndexBuildFailure(_) | Self::Cancelled)
    }
}
