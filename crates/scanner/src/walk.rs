use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::parser;

/// A file or directory found while listing a directory.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn stem(&self) -> &str {
        parser::file_stem(&self.name)
    }
}

/// Classified contents of one directory, each list sorted by name.
#[derive(Debug, Default)]
pub struct DirListing {
    pub videos: Vec<Entry>,
    pub images: Vec<Entry>,
    pub subtitles: Vec<Entry>,
    pub descriptors: Vec<Entry>,
    pub subdirs: Vec<Entry>,
}

impl DirListing {
    /// List the immediate children of `dir`, following symlinks.
    ///
    /// Junk entries are skipped and files of no interest are dropped. Only a
    /// failure to read `dir` itself is an error; unreadable children are skipped.
    pub fn read(dir: &Path) -> io::Result<Self> {
        let mut listing = Self::default();

        let walker = WalkDir::new(dir)
            .follow_links(true)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().to_string();
            if parser::should_ignore(&name) {
                debug!(path = %entry.path().display(), "skipping ignored entry");
                continue;
            }

            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "cannot stat entry");
                    continue;
                }
            };
            let item = Entry {
                path: entry.path().to_path_buf(),
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
                name,
            };

            if meta.is_dir() {
                listing.subdirs.push(item);
            } else if parser::is_video_file(&item.name) {
                listing.videos.push(item);
            } else if parser::is_image_file(&item.name) {
                listing.images.push(item);
            } else if parser::is_descriptor_file(&item.name) {
                listing.descriptors.push(item);
            } else if parser::is_subtitle_file(&item.name) {
                listing.subtitles.push(item);
            }
        }

        Ok(listing)
    }

    /// First image whose stem equals one of `stems`, compared case-insensitively.
    /// Earlier stems take priority.
    pub fn image(&self, stems: &[&str]) -> Option<&Entry> {
        stems.iter().find_map(|stem| {
            self.images
                .iter()
                .find(|img| img.stem().eq_ignore_ascii_case(stem))
        })
    }

    /// Descriptor file with the given name, compared case-insensitively.
    pub fn descriptor(&self, name: &str) -> Option<&Entry> {
        self.descriptors
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }
}

/// Canonical paths of directories already entered during one scan.
///
/// Symlinked directories can point back at an ancestor; entering each
/// canonical directory at most once bounds the walk.
#[derive(Debug, Default)]
pub struct Visited(HashSet<PathBuf>);

impl Visited {
    /// Returns false when `dir` was already entered or cannot be resolved.
    pub fn enter(&mut self, dir: &Path) -> bool {
        match dir.canonicalize() {
            Ok(real) => {
                if self.0.insert(real) {
                    true
                } else {
                    warn!(path = %dir.display(), "directory already visited, possible symlink cycle");
                    false
                }
            }
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "cannot resolve directory");
                false
            }
        }
    }
}

/// Join a relative directory and a name with `/`.
pub fn join_rel(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}
