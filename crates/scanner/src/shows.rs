use std::collections::BTreeMap;
use std::io;

use chrono::Datelike;
use reelbase_core::{Episode, Season, Show, id_hash, item_key, make_sort_name};
use tracing::{debug, warn};

use crate::artwork;
use crate::nfo;
use crate::parser::{self, EpisodeMatch};
use crate::subtitles;
use crate::walk::{DirListing, Entry, Visited, join_rel};

/// A directory that holds episode files: the show root or a season directory.
struct EpisodeSource<'a> {
    /// Season number implied by the directory name.
    season_hint: Option<u32>,
    /// Directory relative to the show directory; empty for the root.
    rel_dir: &'a str,
    listing: &'a DirListing,
}

/// Season id, derived from the show's key since seasons have no file of their own.
pub fn season_id(collection_id: &str, show_rel: &str, season_no: u32) -> String {
    id_hash(&format!("{}#season/{season_no}", item_key(collection_id, show_rel)))
}

fn build_episode(
    collection_id: &str,
    show_rel: &str,
    source: &EpisodeSource<'_>,
    video: &Entry,
) -> Option<Episode> {
    let stem = video.stem();

    let (season_no, episode_no, last_episode_no, file_title, air_date) =
        match parser::parse_episode_filename(&video.name)? {
            EpisodeMatch::Numbered(ep) => (ep.season, ep.episode, ep.last_episode, ep.title, None),
            EpisodeMatch::Dated { date, title } => {
                let season = source
                    .season_hint
                    .unwrap_or_else(|| u32::try_from(date.year()).unwrap_or_default());
                (season, date.month() * 100 + date.day(), None, title, Some(date))
            }
        };

    let mut metadata = source
        .listing
        .descriptor(&format!("{stem}.nfo"))
        .map(|d| nfo::load_nfo(&d.path))
        .unwrap_or_default();
    if metadata.aired.is_none() {
        metadata.aired = air_date;
    }

    let name = metadata
        .title
        .clone()
        .or(file_title)
        .or_else(|| air_date.map(|d| d.to_string()))
        .unwrap_or_else(|| format!("Episode {episode_no}"));
    let file_name = join_rel(source.rel_dir, &video.name);

    Some(Episode {
        id: id_hash(&item_key(collection_id, &join_rel(show_rel, &file_name))),
        sort_name: make_sort_name(&name),
        name,
        season_no,
        episode_no,
        last_episode_no,
        file_size: video.size,
        created: video.modified,
        thumb: artwork::episode_thumb(source.listing, stem, source.rel_dir),
        subtitles: subtitles::episode_subtitles(source.listing, stem, source.rel_dir),
        metadata,
        file_name,
    })
}

/// Build a show from one directory below the collection root.
///
/// Episodes are read from the show directory itself and from every
/// subdirectory named like a season. Returns `Ok(None)` when no episode
/// could be recognized.
pub fn scan_show(
    collection_id: &str,
    dir: &Entry,
    visited: &mut Visited,
) -> io::Result<Option<Show>> {
    let show_rel = dir.name.as_str();
    let root = DirListing::read(&dir.path)?;

    let mut season_dirs: Vec<(u32, &str, DirListing)> = Vec::new();
    for sub in &root.subdirs {
        let Some(season_no) = parser::parse_season_dir(&sub.name) else {
            debug!(path = %sub.path.display(), "not a season directory, skipping");
            continue;
        };
        if !visited.enter(&sub.path) {
            continue;
        }
        match DirListing::read(&sub.path) {
            Ok(listing) => season_dirs.push((season_no, sub.name.as_str(), listing)),
            Err(e) => warn!(path = %sub.path.display(), error = %e, "cannot read season directory"),
        }
    }

    let sources = std::iter::once(EpisodeSource {
        season_hint: None,
        rel_dir: "",
        listing: &root,
    })
    .chain(season_dirs.iter().map(|(no, rel, listing)| EpisodeSource {
        season_hint: Some(*no),
        rel_dir: *rel,
        listing,
    }));

    let mut by_season: BTreeMap<u32, Vec<Episode>> = BTreeMap::new();
    for source in sources {
        for video in &source.listing.videos {
            match build_episode(collection_id, show_rel, &source, video) {
                Some(ep) => by_season.entry(ep.season_no).or_default().push(ep),
                None => debug!(file = %video.name, "no episode pattern, skipping"),
            }
        }
    }

    if by_season.is_empty() {
        debug!(path = %dir.path.display(), "no episodes in show directory, skipping");
        return Ok(None);
    }

    let mut metadata = root
        .descriptor("tvshow.nfo")
        .map(|d| nfo::load_nfo(&d.path))
        .unwrap_or_default();
    let folder = parser::parse_folder_name(&dir.name);
    if metadata.year.is_none() {
        metadata.year = folder.year;
    }
    for (provider, id) in parser::extract_provider_ids(&dir.name) {
        metadata.provider_ids.entry(provider).or_insert(id);
    }

    let (season_all_poster, season_all_banner) = artwork::season_all(&root);

    let seasons: Vec<Season> = by_season
        .into_iter()
        .map(|(season_no, mut episodes)| {
            episodes.sort_by(|a, b| {
                a.episode_no
                    .cmp(&b.episode_no)
                    .then_with(|| a.file_name.cmp(&b.file_name))
            });
            let season_dir = season_dirs
                .iter()
                .find(|(no, _, _)| *no == season_no)
                .map(|(_, rel, listing)| (listing, *rel));
            let art = artwork::season_artwork(&root, season_dir, season_no);
            Season {
                id: season_id(collection_id, show_rel, season_no),
                name: Season::display_name(season_no),
                season_no,
                poster: art.poster.or_else(|| season_all_poster.clone()),
                banner: art.banner.or_else(|| season_all_banner.clone()),
                fanart: art.fanart,
                episodes,
            }
        })
        .collect();

    let created = seasons
        .iter()
        .flat_map(|s| &s.episodes)
        .filter_map(|e| e.created);
    let first_video = created.clone().min();
    let last_video = created.max();

    let name = metadata
        .title
        .clone()
        .unwrap_or_else(|| folder.title.clone());
    let sort_name = match &metadata.sort_title {
        Some(sort) => sort.to_lowercase(),
        None => make_sort_name(&name),
    };

    Ok(Some(Show {
        id: id_hash(&item_key(collection_id, show_rel)),
        name,
        sort_name,
        path: show_rel.to_string(),
        artwork: artwork::show_artwork(&root),
        season_all_poster,
        season_all_banner,
        first_video,
        last_video,
        metadata,
        seasons,
    }))
}
