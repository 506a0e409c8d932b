#![allow(clippy::collapsible_if)]
pub mod document;
pub mod error;
pub mod index;

pub use document::{SearchDocument, normalize, tokenize};
pub use error::SearchError;
pub use index::SearchIndex;
