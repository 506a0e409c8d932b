#![allow(
    clippy::collapsible_if,
    clippy::let_and_return,
    clippy::manual_range_contains
)]
pub mod artwork;
pub mod movies;
pub mod nfo;
pub mod parser;
pub mod scan;
pub mod shows;
pub mod subtitles;
pub mod walk;

pub use scan::{ScanError, ScanOutput, ScanStats, scan_collection};
