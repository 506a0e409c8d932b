use chrono::NaiveDate;
use regex::Regex;
use reelbase_core::SubtitleFormat;
use std::sync::LazyLock;

/// Title and year recovered from a movie or show folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderInfo {
    pub title: String,
    pub year: Option<i32>,
}

/// Season/episode numbers recovered from a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeInfo {
    pub season: u32,
    pub episode: u32,
    /// End of the range for multi-episode files (`S01E04E05`).
    pub last_episode: Option<u32>,
    pub title: Option<String>,
}

/// Result of matching an episode file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeMatch {
    Numbered(EpisodeInfo),
    /// Date-stamped file; the date is an air-date reference, not a number.
    Dated {
        date: NaiveDate,
        title: Option<String>,
    },
}

// Files and directories that are never media.
static IGNORE_NAMES: &[&str] = &[
    ".ds_store",
    "thumbs.db",
    "desktop.ini",
    "@eadir",
    "#recycle",
    ".trash",
    "lost+found",
];

// Ordered by preference when two candidate videos have the same size.
static VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "m4v", "webm", "mov", "avi", "m2ts", "mts", "ts", "wmv", "mpg", "mpeg", "mpe",
    "mpv", "vob", "mxf", "flv", "f4v", "asf", "ogv", "3gp", "3g2",
];

static IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tbn"];

// SxxEyy, with an optional second episode: S01E04E05, s1e4-e5.
static RE_SXXEXX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[ ._\-\[(])s(\d{1,3})[ ._-]?e(\d{1,3})(?:-?e(\d{1,3}))?(?:$|[^0-9])")
        .unwrap()
});

// "Season X Episode Y"
static RE_SEASON_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)season[ ._-]*(\d{1,3})[ ._-]*episode[ ._-]*(\d{1,3})(?:$|[^0-9])").unwrap()
});

// 2015.03.08 or 2015-03-08
static RE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[ ._\-\[(])(\d{4})[.\-](\d{2})[.\-](\d{2})(?:$|[^0-9])").unwrap()
});

// 3x08
static RE_NXMM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[ ._\-\[(])(\d{1,2})x(\d{2,3})(?:$|[^0-9])").unwrap()
});

// 308: one season digit, two episode digits, delimited on both sides.
static RE_NMM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[ ._\-\[(])(\d)(\d{2})(?:$|[ ._\-\])])").unwrap()
});

// Movie: "Title (Year)" or "Title.Year"
static RE_MOVIE_YEAR_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\((\d{4})\)").unwrap());

static RE_MOVIE_YEAR_DOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)[\.\s](\d{4})(?:[\.\s]|$)").unwrap());

// Provider ID in folder name: [tmdb=12345], [tvdb=67890], [imdb=tt123]
static RE_PROVIDER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\w+)=([^\]]+)\]").unwrap());

static RE_SEASON_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:season|series|staffel|saison|s)[ ._-]*(\d{1,3})$").unwrap()
});

static RE_SPECIALS_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^specials?$").unwrap());

/// Check if a file or directory name should be skipped outright.
pub fn should_ignore(name: &str) -> bool {
    if name.starts_with('.') {
        return true;
    }
    let lower = name.to_lowercase();
    IGNORE_NAMES.contains(&lower.as_str())
}

fn extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Check if a file has a video extension.
pub fn is_video_file(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_image_file(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_subtitle_file(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| SubtitleFormat::from_extension(&ext).is_some())
}

pub fn is_descriptor_file(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| ext == "nfo")
}

/// Rank of a video extension; lower is preferred.
pub fn video_priority(filename: &str) -> usize {
    extension(filename)
        .and_then(|ext| VIDEO_EXTENSIONS.iter().position(|e| *e == ext))
        .unwrap_or(VIDEO_EXTENSIONS.len())
}

/// File name without its extension.
pub fn file_stem(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => &filename[..pos],
        _ => filename,
    }
}

/// Extract provider IDs from a folder/file name like `[tmdb=12345]`.
pub fn extract_provider_ids(name: &str) -> Vec<(String, String)> {
    RE_PROVIDER_ID
        .captures_iter(name)
        .map(|c| (c[1].to_lowercase(), c[2].to_string()))
        .collect()
}

/// Remove `[key=value]` provider tags from a name.
pub fn strip_provider_ids(name: &str) -> String {
    let stripped = RE_PROVIDER_ID.replace_all(name, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean up a title: replace dots/underscores with spaces, trim.
pub fn clean_title(raw: &str) -> String {
    raw.replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn trailing_title(stem: &str, from: usize) -> Option<String> {
    let rest = stem.get(from..)?;
    let t = clean_title(rest.trim_start_matches(['-', '.', ' ', '_', ')', ']']));
    if t.is_empty() { None } else { Some(t) }
}

/// Match a season/episode pattern in a video file name.
///
/// Patterns are tried in a fixed order and the first match wins:
/// explicit `SxxEyy` (and "Season X Episode Y"), then a `YYYY.MM.DD` date,
/// then the compact `NxMM` and bare `NMM` forms.
pub fn parse_episode_filename(filename: &str) -> Option<EpisodeMatch> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let stem = if is_video_file(name) { file_stem(name) } else { name };

    if let Some(caps) = RE_SXXEXX.captures(stem) {
        let season: u32 = caps[1].parse().ok()?;
        let episode: u32 = caps[2].parse().ok()?;
        let last_episode = caps
            .get(3)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|last| *last > episode);
        let end = caps.get(3).or_else(|| caps.get(2))?.end();
        return Some(EpisodeMatch::Numbered(EpisodeInfo {
            season,
            episode,
            last_episode,
            title: trailing_title(stem, end),
        }));
    }

    if let Some(caps) = RE_SEASON_EPISODE.captures(stem) {
        let season: u32 = caps[1].parse().ok()?;
        let episode: u32 = caps[2].parse().ok()?;
        return Some(EpisodeMatch::Numbered(EpisodeInfo {
            season,
            episode,
            last_episode: None,
            title: trailing_title(stem, caps.get(2)?.end()),
        }));
    }

    if let Some(caps) = RE_DATE.captures(stem) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(EpisodeMatch::Dated {
                date,
                title: trailing_title(stem, caps.get(3)?.end()),
            });
        }
    }

    for re in [&*RE_NXMM, &*RE_NMM] {
        if let Some(caps) = re.captures(stem) {
            let season: u32 = caps[1].parse().ok()?;
            let episode: u32 = caps[2].parse().ok()?;
            return Some(EpisodeMatch::Numbered(EpisodeInfo {
                season,
                episode,
                last_episode: None,
                title: trailing_title(stem, caps.get(2)?.end()),
            }));
        }
    }

    None
}

/// Season number of a season directory: "Season 01", "S2", "Specials".
pub fn parse_season_dir(name: &str) -> Option<u32> {
    if RE_SPECIALS_DIR.is_match(name.trim()) {
        return Some(0);
    }
    RE_SEASON_DIR
        .captures(name.trim())
        .and_then(|c| c[1].parse().ok())
}

/// Parse a folder name: `Title (2024)`, `Title.2024.1080p`, or just a title.
pub fn parse_folder_name(name: &str) -> FolderInfo {
    let name = strip_provider_ids(name);

    if let Some(caps) = RE_MOVIE_YEAR_PAREN.captures(&name) {
        if let Ok(year) = caps[2].parse::<i32>() {
            return FolderInfo {
                title: caps[1].trim().to_string(),
                year: Some(year),
            };
        }
    }

    if let Some(caps) = RE_MOVIE_YEAR_DOT.captures(&name) {
        if let Ok(year) = caps[2].parse::<i32>() {
            if (1900..=2100).contains(&year) {
                return FolderInfo {
                    title: clean_title(&caps[1]),
                    year: Some(year),
                };
            }
        }
    }

    FolderInfo {
        title: name.trim().to_string(),
        year: None,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(season: u32, episode: u32) -> Option<(u32, u32, Option<u32>)> {
        Some((season, episode, None))
    }

    fn numbers(name: &str) -> Option<(u32, u32, Option<u32>)> {
        match parse_episode_filename(name)? {
            EpisodeMatch::Numbered(ep) => Some((ep.season, ep.episode, ep.last_episode)),
            EpisodeMatch::Dated { .. } => None,
        }
    }

    #[test]
    fn parse_sxxexx() {
        assert_eq!(numbers("Show.S01E02.mkv"), numbered(1, 2));
        assert_eq!(numbers("the.office.s01e01.pilot.mp4"), numbered(1, 1));
        assert_eq!(numbers("Show Name - S10E120 - Finale.mkv"), numbered(10, 120));
    }

    #[test]
    fn parse_sxxexx_with_title() {
        let r = parse_episode_filename("Breaking.Bad.S02E05.Episode.Title.mkv");
        assert_eq!(
            r,
            Some(EpisodeMatch::Numbered(EpisodeInfo {
                season: 2,
                episode: 5,
                last_episode: None,
                title: Some("Episode Title".into()),
            }))
        );
    }

    #[test]
    fn parse_multi_episode() {
        assert_eq!(numbers("show.s01e04e05.mkv"), Some((1, 4, Some(5))));
        assert_eq!(numbers("show.S01E04-E05.mkv"), Some((1, 4, Some(5))));
        // a backwards range is not a range
        assert_eq!(numbers("show.S01E05E04.mkv"), Some((1, 5, None)));
    }

    #[test]
    fn parse_season_episode_words() {
        assert_eq!(numbers("Friends Season 2 Episode 14.mkv"), numbered(2, 14));
    }

    #[test]
    fn parse_xep_format() {
        assert_eq!(numbers("Show.3x08.mkv"), numbered(3, 8));
        assert_eq!(numbers("Seinfeld.3x12.avi"), numbered(3, 12));
    }

    #[test]
    fn parse_bare_compact_format() {
        assert_eq!(numbers("show.308.mkv"), numbered(3, 8));
        // always season 1 episode 23, never episode 123
        assert_eq!(numbers("show.123.mkv"), numbered(1, 23));
        assert_eq!(numbers("show.123.mkv"), numbers("show.123.mkv"));
    }

    #[test]
    fn parse_date_format() {
        assert_eq!(
            parse_episode_filename("Show.2015.03.08.mkv"),
            Some(EpisodeMatch::Dated {
                date: NaiveDate::from_ymd_opt(2015, 3, 8).unwrap(),
                title: None,
            })
        );
        assert!(matches!(
            parse_episode_filename("news-2021-11-30-evening.mp4"),
            Some(EpisodeMatch::Dated { title: Some(t), .. }) if t == "evening"
        ));
    }

    #[test]
    fn explicit_form_wins_over_date() {
        assert_eq!(numbers("Show.2015.03.08.S02E03.mkv"), numbered(2, 3));
    }

    #[test]
    fn date_wins_over_compact() {
        assert!(matches!(
            parse_episode_filename("Show.2015.03.08.308.mkv"),
            Some(EpisodeMatch::Dated { .. })
        ));
    }

    #[test]
    fn invalid_date_falls_through() {
        assert_eq!(parse_episode_filename("Show.2015.13.45.mkv"), None);
    }

    #[test]
    fn non_matching_names() {
        assert_eq!(parse_episode_filename("random.mkv"), None);
        assert_eq!(parse_episode_filename("Movie.1080p.mkv"), None);
        assert_eq!(parse_episode_filename("Inception.2010.mkv"), None);
    }

    #[test]
    fn specials_season_zero() {
        assert_eq!(numbers("Show.Name.S00E01.Special.mkv"), numbered(0, 1));
    }

    #[test]
    fn season_dirs() {
        assert_eq!(parse_season_dir("Season 01"), Some(1));
        assert_eq!(parse_season_dir("season 10"), Some(10));
        assert_eq!(parse_season_dir("S01"), Some(1));
        assert_eq!(parse_season_dir("Season.3"), Some(3));
        assert_eq!(parse_season_dir("Specials"), Some(0));
        assert_eq!(parse_season_dir("Extras"), None);
        assert_eq!(parse_season_dir("Invalid"), None);
    }

    #[test]
    fn parse_movie_with_year_paren() {
        assert_eq!(
            parse_folder_name("The Matrix (1999)"),
            FolderInfo {
                title: "The Matrix".into(),
                year: Some(1999),
            }
        );
    }

    #[test]
    fn parse_movie_with_year_dot() {
        assert_eq!(
            parse_folder_name("Inception.2010.1080p.BluRay"),
            FolderInfo {
                title: "Inception".into(),
                year: Some(2010),
            }
        );
    }

    #[test]
    fn parse_movie_with_provider_tag() {
        assert_eq!(
            parse_folder_name("The Matrix (1999) [imdb=tt0133093]"),
            FolderInfo {
                title: "The Matrix".into(),
                year: Some(1999),
            }
        );
        assert_eq!(parse_folder_name("Some Random Movie").year, None);
    }

    #[test]
    fn ignore_patterns() {
        assert!(should_ignore(".DS_Store"));
        assert!(should_ignore("Thumbs.db"));
        assert!(should_ignore("@eaDir"));
        assert!(should_ignore(".hidden"));
        assert!(!should_ignore("movie.mkv"));
    }

    #[test]
    fn classification() {
        assert!(is_video_file("movie.mkv"));
        assert!(is_video_file("Movie.MP4"));
        assert!(!is_video_file("poster.jpg"));
        assert!(!is_video_file(".mkv"));
        assert!(is_image_file("Poster.JPG"));
        assert!(is_descriptor_file("movie.nfo"));
        assert!(video_priority("a.mkv") < video_priority("a.avi"));
    }

    #[test]
    fn provider_ids_extraction() {
        let ids = extract_provider_ids("Breaking Bad [tmdb=1396] [tvdb=81189]");
        assert_eq!(
            ids,
            vec![
                ("tmdb".to_string(), "1396".to_string()),
                ("tvdb".to_string(), "81189".to_string()),
            ]
        );
        assert_eq!(strip_provider_ids("Breaking Bad [tmdb=1396]"), "Breaking Bad");
    }
}
