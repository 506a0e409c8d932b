use reelbase_core::LibraryError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("document without an id")]
    EmptyId,

    #[error("duplicate document id {0}")]
    DuplicateId(String),

    #[error("search engine: {0}")]
    Engine(String),
}

impl From<tantivy::TantivyError> for SearchError {
    fn from(e: tantivy::TantivyError) -> Self {
        SearchError::Engine(e.to_string())
    }
}

impl From<SearchError> for LibraryError {
    fn from(e: SearchError) -> Self {
        LibraryError::IndexBuildFailure(e.to_string())
    }
}
