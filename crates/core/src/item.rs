use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::metadata::Metadata;
use crate::types::{ItemKind, SubtitleFormat};

/// Image assets found next to an item. Paths are relative to the item's directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Artwork {
    pub poster: Option<String>,
    pub fanart: Option<String>,
    pub banner: Option<String>,
    pub logo: Option<String>,
    pub folder: Option<String>,
}

/// A sidecar subtitle file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subtitle {
    /// ISO 639 code when one could be recognized in the file name.
    pub language: Option<String>,
    /// Human label, e.g. "EN Forced".
    pub label: String,
    pub format: SubtitleFormat,
    /// Path relative to the item's directory.
    pub path: String,
    pub forced: bool,
    pub sdh: bool,
}

/// Subtitles of one video, grouped by format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Subtitles {
    pub srt: Vec<Subtitle>,
    pub vtt: Vec<Subtitle>,
}

impl Subtitles {
    pub fn push(&mut self, sub: Subtitle) {
        match sub.format {
            SubtitleFormat::Srt => self.srt.push(sub),
            SubtitleFormat::Vtt => self.vtt.push(sub),
        }
    }

    pub fn by_format(&self, format: SubtitleFormat) -> &[Subtitle] {
        match format {
            SubtitleFormat::Srt => &self.srt,
            SubtitleFormat::Vtt => &self.vtt,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subtitle> {
        self.srt.iter().chain(self.vtt.iter())
    }

    pub fn len(&self) -> usize {
        self.srt.len() + self.vtt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.srt.is_empty() && self.vtt.is_empty()
    }
}

impl FromIterator<Subtitle> for Subtitles {
    fn from_iter<I: IntoIterator<Item = Subtitle>>(iter: I) -> Self {
        let mut subs = Subtitles::default();
        for sub in iter {
            subs.push(sub);
        }
        subs
    }
}

/// A movie: one directory below the collection root holding one primary video.
#[derive(Debug, Clone, Serialize)]
pub struct Movie {
    pub id: String,
    /// Display name, e.g. "Casablanca".
    pub name: String,
    pub sort_name: String,
    /// Movie directory relative to the collection root.
    pub path: String,
    /// Video file name inside `path`.
    pub file_name: String,
    pub file_size: u64,
    /// Modification time of the video file.
    pub created: Option<DateTime<Utc>>,
    pub artwork: Artwork,
    pub metadata: Metadata,
    pub subtitles: Subtitles,
}

impl Movie {
    /// Video path relative to the collection root.
    pub fn file_path(&self) -> String {
        format!("{}/{}", self.path, self.file_name)
    }

    pub fn duration(&self) -> Duration {
        self.metadata.duration()
    }
}

/// A TV show with its seasons, ordered by season number.
#[derive(Debug, Clone, Serialize)]
pub struct Show {
    pub id: String,
    pub name: String,
    pub sort_name: String,
    /// Show directory relative to the collection root.
    pub path: String,
    pub artwork: Artwork,
    /// Fallback poster for seasons without their own, often "season-all-poster.jpg".
    pub season_all_poster: Option<String>,
    pub season_all_banner: Option<String>,
    /// Modification time of the oldest episode file.
    pub first_video: Option<DateTime<Utc>>,
    /// Modification time of the newest episode file.
    pub last_video: Option<DateTime<Utc>>,
    pub metadata: Metadata,
    pub seasons: Vec<Season>,
}

impl Show {
    pub fn season(&self, season_no: u32) -> Option<&Season> {
        self.seasons.iter().find(|s| s.season_no == season_no)
    }

    /// All episodes in (season, episode) order.
    pub fn episodes(&self) -> impl Iterator<Item = &Episode> {
        self.seasons.iter().flat_map(|s| s.episodes.iter())
    }

    pub fn episode_count(&self) -> usize {
        self.seasons.iter().map(|s| s.episodes.len()).sum()
    }

    pub fn duration(&self) -> Duration {
        self.seasons.iter().map(Season::duration).sum()
    }
}

/// A season of a show. Season 0 holds the specials.
#[derive(Debug, Clone, Serialize)]
pub struct Season {
    pub id: String,
    pub name: String,
    pub season_no: u32,
    /// Poster relative to the show directory; already falls back to the
    /// show's season-all poster.
    pub poster: Option<String>,
    pub banner: Option<String>,
    pub fanart: Option<String>,
    pub episodes: Vec<Episode>,
}

impl Season {
    pub fn display_name(season_no: u32) -> String {
        if season_no == 0 {
            "Specials".to_string()
        } else {
            format!("Season {season_no}")
        }
    }

    pub fn is_specials(&self) -> bool {
        self.season_no == 0
    }

    pub fn duration(&self) -> Duration {
        self.episodes.iter().map(Episode::duration).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Episode {
    pub id: String,
    pub name: String,
    pub sort_name: String,
    pub season_no: u32,
    pub episode_no: u32,
    /// Last episode covered by a multi-episode file, e.g. 5 for `S01E04E05`.
    pub last_episode_no: Option<u32>,
    /// Video path relative to the show directory, e.g. "Season 01/show.s01e01.mkv".
    pub file_name: String,
    pub file_size: u64,
    pub created: Option<DateTime<Utc>>,
    /// Thumbnail relative to the show directory.
    pub thumb: Option<String>,
    pub metadata: Metadata,
    pub subtitles: Subtitles,
}

impl Episode {
    pub fn is_multi_episode(&self) -> bool {
        self.last_episode_no.is_some_and(|last| last > self.episode_no)
    }

    /// Base name of the video without directory and extension.
    pub fn base_name(&self) -> &str {
        let name = self.file_name.rsplit('/').next().unwrap_or(&self.file_name);
        match name.rfind('.') {
            Some(pos) if pos > 0 => &name[..pos],
            _ => name,
        }
    }

    pub fn duration(&self) -> Duration {
        self.metadata.duration()
    }
}

/// A top-level library entry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    Movie(Movie),
    Show(Show),
}

impl Item {
    pub fn as_item_ref(&self) -> ItemRef<'_> {
        match self {
            Item::Movie(m) => ItemRef::Movie(m),
            Item::Show(s) => ItemRef::Show(s),
        }
    }

    pub fn id(&self) -> &str {
        self.as_item_ref().id()
    }

    pub fn name(&self) -> &str {
        self.as_item_ref().name()
    }

    pub fn sort_name(&self) -> &str {
        self.as_item_ref().sort_name()
    }

    pub fn kind(&self) -> ItemKind {
        self.as_item_ref().kind()
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            Item::Movie(m) => &m.metadata,
            Item::Show(s) => &s.metadata,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Item::Movie(m) => &m.path,
            Item::Show(s) => &s.path,
        }
    }
}

/// Borrowed view over any addressable entry of a snapshot.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemRef<'a> {
    Movie(&'a Movie),
    Show(&'a Show),
    Season(&'a Season),
    Episode(&'a Episode),
}

impl<'a> ItemRef<'a> {
    pub fn id(&self) -> &'a str {
        match *self {
            ItemRef::Movie(m) => &m.id,
            ItemRef::Show(s) => &s.id,
            ItemRef::Season(s) => &s.id,
            ItemRef::Episode(e) => &e.id,
        }
    }

    pub fn name(&self) -> &'a str {
        match *self {
            ItemRef::Movie(m) => &m.name,
            ItemRef::Show(s) => &s.name,
            ItemRef::Season(s) => &s.name,
            ItemRef::Episode(e) => &e.name,
        }
    }

    pub fn sort_name(&self) -> &'a str {
        match *self {
            ItemRef::Movie(m) => &m.sort_name,
            ItemRef::Show(s) => &s.sort_name,
            ItemRef::Season(s) => &s.name,
            ItemRef::Episode(e) => &e.sort_name,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ItemRef::Movie(_) => ItemKind::Movie,
            ItemRef::Show(_) => ItemKind::Show,
            ItemRef::Season(_) => ItemKind::Season,
            ItemRef::Episode(_) => ItemKind::Episode,
        }
    }

    /// Seasons carry no descriptor of their own.
    pub fn metadata(&self) -> Option<&'a Metadata> {
        match *self {
            ItemRef::Movie(m) => Some(&m.metadata),
            ItemRef::Show(s) => Some(&s.metadata),
            ItemRef::Season(_) => None,
            ItemRef::Episode(e) => Some(&e.metadata),
        }
    }

    pub fn duration(&self) -> Duration {
        match *self {
            ItemRef::Movie(m) => m.duration(),
            ItemRef::Show(s) => s.duration(),
            ItemRef::Season(s) => s.duration(),
            ItemRef::Episode(e) => e.duration(),
        }
    }

    pub fn as_episode(&self) -> Option<&'a Episode> {
        match *self {
            ItemRef::Episode(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_show(&self) -> Option<&'a Show> {
        match *self {
            ItemRef::Show(s) => Some(s),
            _ => None,
        }
    }
}

static YEAR_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d{4}\)\s*$").unwrap());

const ARTICLES: &[&str] = &["the ", "a ", "an "];

/// Normalize a display name into a sort key: lowercase, no leading article,
/// no leading punctuation, no trailing "(YYYY)".
pub fn make_sort_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let mut title = lower.as_str();
    for article in ARTICLES {
        if let Some(rest) = title.strip_prefix(article) {
            title = rest.trim_start();
            break;
        }
    }
    let title = title.trim_start_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation());
    YEAR_SUFFIX.replace(title, "").trim().to_string()
}
