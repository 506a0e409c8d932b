use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};
use reelbase_core::{
    Collection, CollectionDetails, Episode, Item, ItemRef, LibraryError, Season, Show,
};
use reelbase_search::{SearchDocument, SearchIndex};

use crate::watch::{WatchState, next_up};

/// Where an id lives inside the collection tree.
#[derive(Debug, Clone, Copy)]
enum Location {
    Item {
        collection: usize,
        item: usize,
    },
    Season {
        collection: usize,
        item: usize,
        season: usize,
    },
    Episode {
        collection: usize,
        item: usize,
        season: usize,
        episode: usize,
    },
}

impl Location {
    fn collection(self) -> usize {
        match self {
            Self::Item { collection, .. }
            | Self::Season { collection, .. }
            | Self::Episode { collection, .. } => collection,
        }
    }
}

/// A season together with its show and collection.
#[derive(Debug, Clone, Copy)]
pub struct SeasonRef<'a> {
    pub collection: &'a Collection,
    pub show: &'a Show,
    pub season: &'a Season,
}

/// An episode together with its show, season and collection.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeRef<'a> {
    pub collection: &'a Collection,
    pub show: &'a Show,
    pub season: &'a Season,
    pub episode: &'a Episode,
}

/// One immutable, fully built generation of the library: the collections
/// and the search index over exactly those collections.
///
/// Readers hold it through an `Arc` for as long as they need; a refresh
/// never touches a published snapshot, it builds the next one.
#[derive(Debug, Default)]
pub struct Snapshot {
    generation: u64,
    built_at: Option<DateTime<Utc>>,
    collections: Vec<Collection>,
    index: SearchIndex,
    locations: HashMap<String, Location>,
}

impl Snapshot {
    /// The snapshot served before the first refresh: no collections, no documents.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the id map and search index over `collections`.
    ///
    /// Fails with `IndexBuildFailure` on duplicate ids; nothing partial is
    /// returned.
    pub fn build(generation: u64, collections: Vec<Collection>) -> Result<Self, LibraryError> {
        let locations = locate(&collections)?;
        let index = SearchIndex::index_batch(documents(&collections))?;
        Ok(Self {
            generation,
            built_at: Some(Utc::now()),
            collections,
            index,
            locations,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    pub fn get_collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn get_collection(&self, collection_id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == collection_id)
    }

    /// Number of searchable entries (movies, shows, episodes).
    pub fn document_count(&self) -> usize {
        self.index.len()
    }

    pub fn get_item(&self, collection_id: &str, item_id: &str) -> Option<ItemRef<'_>> {
        let location = *self.locations.get(item_id)?;
        if self.collections[location.collection()].id != collection_id {
            return None;
        }
        self.resolve(location)
    }

    pub fn get_item_by_id(&self, item_id: &str) -> Option<ItemRef<'_>> {
        self.resolve(*self.locations.get(item_id)?)
    }

    pub fn get_show(&self, show_id: &str) -> Option<&Show> {
        self.get_item_by_id(show_id)?.as_show()
    }

    pub fn get_season_by_id(&self, season_id: &str) -> Option<SeasonRef<'_>> {
        let Location::Season {
            collection,
            item,
            season,
        } = *self.locations.get(season_id)?
        else {
            return None;
        };
        let (collection, show) = self.show_at(collection, item)?;
        Some(SeasonRef {
            collection,
            show,
            season: show.seasons.get(season)?,
        })
    }

    pub fn get_episode_by_id(&self, episode_id: &str) -> Option<EpisodeRef<'_>> {
        let Location::Episode {
            collection,
            item,
            season,
            episode,
        } = *self.locations.get(episode_id)?
        else {
            return None;
        };
        let (collection, show) = self.show_at(collection, item)?;
        let season = show.seasons.get(season)?;
        Some(EpisodeRef {
            collection,
            show,
            season,
            episode: season.episodes.get(episode)?,
        })
    }

    /// Items matching `term`, most relevant first.
    pub fn search(&self, term: &str, limit: usize) -> Vec<ItemRef<'_>> {
        self.index
            .search(term, limit)
            .iter()
            .filter_map(|id| self.get_item_by_id(id))
            .collect()
    }

    /// Items resembling `item`, closest first. Seasons have no neighbours.
    pub fn similar(&self, item: ItemRef<'_>, limit: usize) -> Vec<ItemRef<'_>> {
        let Some(reference) = self.index.get(item.id()) else {
            return Vec::new();
        };
        self.index
            .similar(reference, limit)
            .iter()
            .filter_map(|id| self.get_item_by_id(id))
            .collect()
    }

    /// Aggregate details over every collection.
    pub fn details(&self) -> CollectionDetails {
        let mut details = CollectionDetails::default();
        for collection in &self.collections {
            details.add_collection(collection);
        }
        details
    }

    /// Next episode of `show_id` for the given watch state.
    pub fn next_up(
        &self,
        show_id: &str,
        state: &WatchState,
    ) -> Result<Option<&Episode>, LibraryError> {
        let show = self
            .get_show(show_id)
            .ok_or_else(|| LibraryError::NotFound(show_id.to_string()))?;
        Ok(next_up(show, state))
    }

    fn show_at(&self, collection: usize, item: usize) -> Option<(&Collection, &Show)> {
        let collection = self.collections.get(collection)?;
        match collection.items.get(item)? {
            Item::Show(show) => Some((collection, show)),
            Item::Movie(_) => None,
        }
    }

    fn resolve(&self, location: Location) -> Option<ItemRef<'_>> {
        match location {
            Location::Item { collection, item } => self
                .collections
                .get(collection)?
                .items
                .get(item)
                .map(Item::as_item_ref),
            Location::Season {
                collection,
                item,
                season,
            } => {
                let (_, show) = self.show_at(collection, item)?;
                show.seasons.get(season).map(ItemRef::Season)
            }
            Location::Episode {
                collection,
                item,
                season,
                episode,
            } => {
                let (_, show) = self.show_at(collection, item)?;
                show.seasons
                    .get(season)?
                    .episodes
                    .get(episode)
                    .map(ItemRef::Episode)
            }
        }
    }
}

fn locate(collections: &[Collection]) -> Result<HashMap<String, Location>, LibraryError> {
    let mut locations = HashMap::new();
    let mut insert = |id: &str, location: Location| match locations.entry(id.to_string()) {
        Entry::Occupied(_) => Err(LibraryError::IndexBuildFailure(format!(
            "duplicate item id {id}"
        ))),
        Entry::Vacant(slot) => {
            slot.insert(location);
            Ok(())
        }
    };

    for (ci, collection) in collections.iter().enumerate() {
        for (ii, item) in collection.items.iter().enumerate() {
            insert(
                item.id(),
                Location::Item {
                    collection: ci,
                    item: ii,
                },
            )?;
            let Item::Show(show) = item else { continue };
            for (si, season) in show.seasons.iter().enumerate() {
                insert(
                    &season.id,
                    Location::Season {
                        collection: ci,
                        item: ii,
                        season: si,
                    },
                )?;
                for (ei, episode) in season.episodes.iter().enumerate() {
                    insert(
                        &episode.id,
                        Location::Episode {
                            collection: ci,
                            item: ii,
                            season: si,
                            episode: ei,
                        },
                    )?;
                }
            }
        }
    }
    Ok(locations)
}

/// Searchable documents: movies, shows and their episodes. Seasons are skipped.
fn documents(collections: &[Collection]) -> Vec<SearchDocument> {
    let mut docs = Vec::new();
    for item in collections.iter().flat_map(|c| &c.items) {
        docs.extend(SearchDocument::from_item(item.as_item_ref(), None));
        if let Item::Show(show) = item {
            docs.extend(
                show.episodes()
                    .filter_map(|e| SearchDocument::from_item(ItemRef::Episode(e), Some(show.id.as_str()))),
            );
        }
    }
    docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelbase_core::{
        Artwork, CollectionConfig, CollectionType, ItemKind, Metadata, Movie, Subtitles,
    };
    use std::collections::BTreeSet;

    use crate::watch::EpisodeWatch;

    fn movie(id: &str, name: &str, genres: &[&str]) -> Item {
        Item::Movie(Movie {
            id: id.into(),
            name: name.into(),
            sort_name: reelbase_core::make_sort_name(name),
            path: name.into(),
            file_name: format!("{name}.mkv"),
            file_size: 0,
            created: None,
            artwork: Artwork::default(),
            metadata: Metadata {
                genres: genres.iter().map(|g| g.to_string()).collect(),
                ..Default::default()
            },
            subtitles: Subtitles::default(),
        })
    }

    fn episode(id: &str, season_no: u32, episode_no: u32, name: &str) -> Episode {
        Episode {
            id: id.into(),
            name: name.into(),
            sort_name: name.to_lowercase(),
            season_no,
            episode_no,
            last_episode_no: None,
            file_name: format!("{id}.mkv"),
            file_size: 0,
            created: None,
            thumb: None,
            metadata: Metadata::default(),
            subtitles: Subtitles::default(),
        }
    }

    fn show() -> Item {
        Item::Show(Show {
            id: "wire".into(),
            name: "The Wire".into(),
            sort_name: "wire".into(),
            path: "The Wire".into(),
            artwork: Artwork::default(),
            season_all_poster: None,
            season_all_banner: None,
            first_video: None,
            last_video: None,
            metadata: Metadata {
                genres: BTreeSet::from(["Crime".to_string()]),
                ..Default::default()
            },
            seasons: vec![Season {
                id: "wire-s1".into(),
                name: "Season 1".into(),
                season_no: 1,
                poster: None,
                banner: None,
                fanart: None,
                episodes: vec![
                    episode("wire-e1", 1, 1, "The Target"),
                    episode("wire-e2", 1, 2, "The Detail"),
                ],
            }],
        })
    }

    fn collection(id: &str, kind: CollectionType, items: Vec<Item>) -> Collection {
        Collection {
            items,
            ..Collection::empty(&CollectionConfig::new(id, id, kind, "/lib"))
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot::build(
            7,
            vec![
                collection(
                    "movies",
                    CollectionType::Movies,
                    vec![
                        movie("heat", "Heat", &["Crime", "Drama"]),
                        movie("ronin", "Ronin", &["Crime", "Action"]),
                    ],
                ),
                collection("tv", CollectionType::Shows, vec![show()]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn empty_snapshot_finds_nothing() {
        let snap = Snapshot::empty();
        assert_eq!(snap.generation(), 0);
        assert!(snap.built_at().is_none());
        assert!(snap.get_collections().is_empty());
        assert!(snap.get_item_by_id("heat").is_none());
        assert!(snap.search("heat", 10).is_empty());
        assert_eq!(
            snap.next_up("wire", &WatchState::new()).unwrap_err(),
            LibraryError::NotFound("wire".into())
        );
    }

    #[test]
    fn lookups_at_every_level() {
        let snap = snapshot();
        assert_eq!(snap.generation(), 7);
        assert_eq!(snap.get_item_by_id("heat").map(|i| i.kind()), Some(ItemKind::Movie));
        assert_eq!(snap.get_item_by_id("wire-s1").map(|i| i.kind()), Some(ItemKind::Season));
        assert_eq!(snap.get_item_by_id("wire-e2").map(|i| i.name()), Some("The Detail"));

        assert!(snap.get_item("tv", "wire-e1").is_some());
        assert!(snap.get_item("movies", "wire-e1").is_none());
        assert!(snap.get_item("tv", "nope").is_none());

        let ep = snap.get_episode_by_id("wire-e2").unwrap();
        assert_eq!(ep.collection.id, "tv");
        assert_eq!(ep.show.id, "wire");
        assert_eq!(ep.season.season_no, 1);
        assert!(snap.get_episode_by_id("heat").is_none());

        let season = snap.get_season_by_id("wire-s1").unwrap();
        assert_eq!(season.show.name, "The Wire");
        assert!(snap.get_season_by_id("wire-e1").is_none());
    }

    #[test]
    fn index_matches_collections() {
        let snap = snapshot();
        let expected: usize = snap.get_collections().iter().map(Collection::document_count).sum();
        assert_eq!(snap.document_count(), expected);
        assert_eq!(snap.document_count(), 2 + 1 + 2);
    }

    #[test]
    fn search_resolves_items() {
        let snap = snapshot();
        let hits: Vec<&str> = snap.search("detail", 10).iter().map(|i| i.id()).collect();
        assert_eq!(hits, vec!["wire-e2"]);
        let crime: Vec<&str> = snap.search("crime", 10).iter().map(|i| i.id()).collect();
        assert_eq!(crime, vec!["heat", "ronin", "wire"]);
    }

    #[test]
    fn similar_items_share_kind() {
        let snap = snapshot();
        let heat = snap.get_item_by_id("heat").unwrap();
        let ids: Vec<&str> = snap.similar(heat, 10).iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["ronin"]);
        let season = snap.get_item_by_id("wire-s1").unwrap();
        assert!(snap.similar(season, 10).is_empty());
    }

    #[test]
    fn details_aggregate_all_collections() {
        let d = snapshot().details();
        assert_eq!((d.movie_count, d.show_count, d.episode_count), (2, 1, 2));
        assert_eq!(d.genres.get("Crime"), Some(&3));
    }

    #[test]
    fn duplicate_ids_fail_the_build() {
        let err = Snapshot::build(
            1,
            vec![
                collection("a", CollectionType::Movies, vec![movie("x", "X", &[])]),
                collection("b", CollectionType::Movies, vec![movie("x", "Y", &[])]),
            ],
        )
        .unwrap_err();
        assert_eq!(err.code(), "index_build_failure");
    }

    #[test]
    fn next_up_through_snapshot() {
        let snap = snapshot();
        let mut state = WatchState::new();
        state.set("wire-e1", EpisodeWatch::watched());
        let next = snap.next_up("wire", &state).unwrap().map(|e| e.id.as_str());
        assert_eq!(next, Some("wire-e2"));
    }
}
