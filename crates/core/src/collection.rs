use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::idhash::id_hash;
use crate::item::Item;
use crate::types::CollectionType;

/// One configured library root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Stable id. Derived from the name when left empty.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub collection_type: CollectionType,
    pub directory: PathBuf,
}

impl CollectionConfig {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        collection_type: CollectionType,
        directory: impl Into<PathBuf>,
    ) -> Self {
        let mut cfg = Self {
            id: id.into(),
            name: name.into(),
            collection_type,
            directory: directory.into(),
        };
        cfg.ensure_id();
        cfg
    }

    /// Fill in a name-derived id if none was configured.
    pub fn ensure_id(&mut self) {
        if self.id.trim().is_empty() {
            self.id = id_hash(&self.name);
        }
    }
}

/// A scanned library root and its top-level items.
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub collection_type: CollectionType,
    pub directory: PathBuf,
    pub items: Vec<Item>,
}

impl Collection {
    pub fn empty(cfg: &CollectionConfig) -> Self {
        Self {
            id: cfg.id.clone(),
            name: cfg.name.clone(),
            collection_type: cfg.collection_type,
            directory: cfg.directory.clone(),
            items: Vec::new(),
        }
    }

    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id() == item_id)
    }

    /// Number of searchable entries: movies, shows and episodes.
    pub fn document_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                Item::Movie(_) => 1,
                Item::Show(show) => 1 + show.episode_count(),
            })
            .sum()
    }

    /// Aggregate details, always computed from the current item list.
    pub fn details(&self) -> CollectionDetails {
        let mut details = CollectionDetails::default();
        details.add_collection(self);
        details
    }

    /// Number of top-level items per genre.
    pub fn genre_count(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            for genre in &item.metadata().genres {
                if !genre.is_empty() {
                    *counts.entry(genre.clone()).or_insert(0) += 1;
                }
            }
        }
        counts
    }
}

/// Aggregate view over one or more collections. Never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionDetails {
    pub movie_count: usize,
    pub show_count: usize,
    pub episode_count: usize,
    pub genres: BTreeMap<String, usize>,
    pub studios: BTreeSet<String>,
    pub official_ratings: BTreeSet<String>,
    pub years: BTreeSet<i32>,
}

impl CollectionDetails {
    pub fn add_collection(&mut self, collection: &Collection) {
        for item in &collection.items {
            match item {
                Item::Movie(_) => self.movie_count += 1,
                Item::Show(show) => {
                    self.show_count += 1;
                    self.episode_count += show.episode_count();
                }
            }
            let meta = item.metadata();
            for genre in meta.genres.iter().filter(|g| !g.is_empty()) {
                *self.genres.entry(genre.clone()).or_insert(0) += 1;
            }
            self.studios
                .extend(meta.studios.iter().filter(|s| !s.is_empty()).cloned());
            if let Some(rating) = meta.official_rating.as_ref().filter(|r| !r.is_empty()) {
                self.official_ratings.insert(rating.clone());
            }
            if let Some(year) = meta.effective_year() {
                self.years.insert(year);
            }
        }
    }
}
