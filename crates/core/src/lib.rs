#![allow(clippy::collapsible_if)]
pub mod collection;
pub mod error;
pub mod idhash;
pub mod item;
pub mod metadata;
pub mod types;

pub use collection::{Collection, CollectionConfig, CollectionDetails};
pub use error::LibraryError;
pub use idhash::{id_hash, item_key};
pub use item::{
    Artwork, Episode, Item, ItemRef, Movie, Season, Show, Subtitle, Subtitles, make_sort_name,
};
pub use metadata::{Metadata, Person, StreamDetails};
pub use types::{CollectionType, ItemKind, SubtitleFormat};
