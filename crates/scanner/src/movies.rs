use std::io;

use reelbase_core::{Movie, id_hash, item_key, make_sort_name};
use tracing::debug;

use crate::artwork;
use crate::nfo;
use crate::parser;
use crate::subtitles;
use crate::walk::{DirListing, Entry};

/// The video a movie directory is about: the largest file, then the
/// preferred container, then the first name.
fn primary_video(listing: &DirListing) -> Option<&Entry> {
    listing.videos.iter().min_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| parser::video_priority(&a.name).cmp(&parser::video_priority(&b.name)))
            .then_with(|| a.name.cmp(&b.name))
    })
}

/// Descriptor for a movie: `<video stem>.nfo`, then `movie.nfo`, then any `.nfo`.
fn descriptor<'a>(listing: &'a DirListing, video_stem: &str) -> Option<&'a Entry> {
    listing
        .descriptor(&format!("{video_stem}.nfo"))
        .or_else(|| listing.descriptor("movie.nfo"))
        .or_else(|| listing.descriptors.first())
}

/// Build a movie from one directory below the collection root.
///
/// Returns `Ok(None)` when the directory holds no video.
pub fn scan_movie(collection_id: &str, dir: &Entry) -> io::Result<Option<Movie>> {
    let listing = DirListing::read(&dir.path)?;

    let Some(video) = primary_video(&listing) else {
        debug!(path = %dir.path.display(), "no video in movie directory, skipping");
        return Ok(None);
    };
    let stem = video.stem();

    let mut metadata = descriptor(&listing, stem)
        .map(|d| nfo::load_nfo(&d.path))
        .unwrap_or_default();

    let folder = parser::parse_folder_name(&dir.name);
    if metadata.year.is_none() {
        metadata.year = folder.year;
    }
    for (provider, id) in parser::extract_provider_ids(&dir.name) {
        metadata.provider_ids.entry(provider).or_insert(id);
    }

    let name = metadata
        .title
        .clone()
        .unwrap_or_else(|| folder.title.clone());
    let sort_name = match &metadata.sort_title {
        Some(sort) => sort.to_lowercase(),
        None => make_sort_name(&name),
    };

    Ok(Some(Movie {
        id: id_hash(&item_key(collection_id, &dir.name)),
        name,
        sort_name,
        path: dir.name.clone(),
        file_name: video.name.clone(),
        file_size: video.size,
        created: video.modified,
        artwork: artwork::movie_artwork(&listing, stem),
        subtitles: subtitles::movie_subtitles(&listing, stem),
        metadata,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn movie_dir(name: &str, files: &[(&str, &str)]) -> (tempfile::TempDir, Entry) {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(name);
        fs::create_dir(&dir).unwrap();
        for (file, content) in files {
            fs::write(dir.join(file), content).unwrap();
        }
        let entry = DirListing::read(tmp.path()).unwrap().subdirs.remove(0);
        (tmp, entry)
    }

    #[test]
    fn largest_video_wins() {
        let (_tmp, dir) = movie_dir(
            "Heat (1995)",
            &[("sample.mkv", "x"), ("Heat.1995.mp4", "xxxxxxxx"), ("Heat.1995.avi", "xxx")],
        );
        let movie = scan_movie("c", &dir).unwrap().unwrap();
        assert_eq!(movie.file_name, "Heat.1995.mp4");
        assert_eq!(movie.file_size, 8);
        assert_eq!(movie.name, "Heat");
        assert_eq!(movie.metadata.year, Some(1995));
        assert_eq!(movie.path, "Heat (1995)");
    }

    #[test]
    fn extension_priority_breaks_size_ties() {
        let (_tmp, dir) = movie_dir("Tie", &[("b.avi", "xx"), ("a.mp4", "xx"), ("c.mkv", "xx")]);
        let movie = scan_movie("c", &dir).unwrap().unwrap();
        assert_eq!(movie.file_name, "c.mkv");
    }

    #[test]
    fn descriptor_overrides_folder_names() {
        let (_tmp, dir) = movie_dir(
            "the.thing.1982 [tmdb=1091]",
            &[
                ("The.Thing.mkv", "v"),
                ("The.Thing.nfo", "<movie><title>The Thing</title><sorttitle>Thing</sorttitle></movie>"),
                ("movie.nfo", "<movie><title>Wrong</title></movie>"),
            ],
        );
        let movie = scan_movie("c", &dir).unwrap().unwrap();
        assert_eq!(movie.name, "The Thing");
        assert_eq!(movie.sort_name, "thing");
        assert_eq!(movie.metadata.year, Some(1982));
        assert_eq!(movie.metadata.provider_ids.get("tmdb").map(String::as_str), Some("1091"));
    }

    #[test]
    fn broken_descriptor_falls_back_to_folder() {
        let (_tmp, dir) = movie_dir(
            "The Birds (1963)",
            &[("birds.mkv", "v"), ("movie.nfo", "<movie><title>The Birds")],
        );
        let movie = scan_movie("c", &dir).unwrap().unwrap();
        assert_eq!(movie.name, "The Birds");
        assert_eq!(movie.sort_name, "birds");
        assert_eq!(movie.metadata.title, None);
    }

    #[test]
    fn directory_without_video_is_skipped() {
        let (_tmp, dir) = movie_dir("Empty", &[("poster.jpg", "img"), ("movie.nfo", "<movie/>")]);
        assert!(scan_movie("c", &dir).unwrap().is_none());
    }

    #[test]
    fn ids_are_stable() {
        let (_tmp, dir) = movie_dir("Alien (1979)", &[("alien.mkv", "v")]);
        let a = scan_movie("c", &dir).unwrap().unwrap();
        let b = scan_movie("c", &dir).unwrap().unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, scan_movie("other", &dir).unwrap().unwrap().id);
    }
}
