//! Sidecar subtitle discovery.
//!
//! Naming conventions:
//! - `Movie.en.srt`          → language "en"
//! - `Movie.en.forced.srt`   → language "en", forced
//! - `Movie.srt`             → unknown language
//! - `Movie.en.hi.vtt`       → language "en", hearing impaired
//!
//! Only `.srt` and `.vtt` are recognized.

use reelbase_core::{Subtitle, SubtitleFormat, Subtitles};

use crate::parser;
use crate::walk::{DirListing, Entry, join_rel};

/// ISO 639-1 two-letter language codes (common subset for validation).
const LANG_CODES: &[&str] = &[
    "aa", "ab", "af", "ak", "am", "an", "ar", "as", "av", "ay", "az", "ba", "be", "bg", "bh",
    "bi", "bm", "bn", "bo", "br", "bs", "ca", "ce", "ch", "co", "cr", "cs", "cu", "cv", "cy",
    "da", "de", "dv", "dz", "ee", "el", "en", "eo", "es", "et", "eu", "fa", "ff", "fi", "fj",
    "fo", "fr", "fy", "ga", "gd", "gl", "gn", "gu", "gv", "ha", "he", "hi", "ho", "hr", "ht",
    "hu", "hy", "hz", "ia", "id", "ie", "ig", "ii", "ik", "in", "io", "is", "it", "iu", "ja",
    "jv", "ka", "kg", "ki", "kj", "kk", "kl", "km", "kn", "ko", "kr", "ks", "ku", "kv", "kw",
    "ky", "la", "lb", "lg", "li", "ln", "lo", "lt", "lu", "lv", "mg", "mh", "mi", "mk", "ml",
    "mn", "mr", "ms", "mt", "my", "na", "nb", "nd", "ne", "ng", "nl", "nn", "no", "nr", "nv",
    "ny", "oc", "oj", "om", "or", "os", "pa", "pi", "pl", "ps", "pt", "qu", "rm", "rn", "ro",
    "ru", "rw", "sa", "sc", "sd", "se", "sg", "si", "sk", "sl", "sm", "sn", "so", "sq", "sr",
    "ss", "st", "su", "sv", "sw", "ta", "te", "tg", "th", "ti", "tk", "tl", "tn", "to", "tr",
    "ts", "tt", "tw", "ty", "ug", "uk", "ur", "uz", "ve", "vi", "vo", "wa", "wo", "xh", "yi",
    "yo", "za", "zh", "zu",
];

/// ISO 639-2 codes seen in subtitle file names.
const LANG_CODES_3: &[&str] = &[
    "ara", "bul", "ces", "chi", "cze", "dan", "deu", "dut", "ell", "eng", "est", "fas", "fin",
    "fra", "fre", "ger", "gre", "heb", "hin", "hrv", "hun", "ind", "ita", "jpn", "kor", "lav",
    "lit", "may", "msa", "nld", "nor", "per", "pol", "por", "ron", "rum", "rus", "slk", "slv",
    "spa", "srp", "swe", "tha", "tur", "ukr", "und", "vie", "zho",
];

fn is_lang_code(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    LANG_CODES.contains(&lower.as_str()) || LANG_CODES_3.contains(&lower.as_str())
}

/// Language, forced and SDH markers from dot-separated name segments.
fn parse_sub_markers(extra: &str) -> (Option<String>, bool, bool) {
    let mut language = None;
    let mut forced = false;
    let mut sdh = false;

    for part in extra.split('.').filter(|s| !s.is_empty()) {
        let lower = part.to_ascii_lowercase();
        if lower == "forced" {
            forced = true;
        } else if lower == "sdh" || lower == "hi" || lower == "cc" {
            sdh = true;
        } else if language.is_none() && is_lang_code(&lower) {
            language = Some(lower);
        }
    }

    (language, forced, sdh)
}

fn build_label(language: &Option<String>, forced: bool, sdh: bool) -> String {
    let mut parts = Vec::new();
    if let Some(lang) = language {
        parts.push(lang.to_uppercase());
    } else {
        parts.push("Unknown".into());
    }
    if forced {
        parts.push("Forced".into());
    }
    if sdh {
        parts.push("SDH".into());
    }
    parts.join(" ")
}

/// Segments after `video_stem` when `sub_stem` belongs to that video.
fn belongs_to<'a>(video_stem: &str, sub_stem: &'a str) -> Option<&'a str> {
    let rest = sub_stem.strip_prefix(video_stem)?;
    if rest.is_empty() || rest.starts_with('.') {
        Some(rest)
    } else {
        None
    }
}

fn to_subtitle(entry: &Entry, extra: &str, rel_dir: &str) -> Option<Subtitle> {
    let ext = entry.name.rsplit_once('.')?.1;
    let format = SubtitleFormat::from_extension(ext)?;
    let (language, forced, sdh) = parse_sub_markers(extra);
    Some(Subtitle {
        label: build_label(&language, forced, sdh),
        language,
        format,
        path: join_rel(rel_dir, &entry.name),
        forced,
        sdh,
    })
}

/// Subtitles of a movie: every subtitle file in its directory.
///
/// Files named after the video have their markers read from the segments that
/// follow the video name; loose files from all of their segments.
pub fn movie_subtitles(listing: &DirListing, video_stem: &str) -> Subtitles {
    listing
        .subtitles
        .iter()
        .filter_map(|entry| {
            let stem = parser::file_stem(&entry.name);
            let extra = belongs_to(video_stem, stem).unwrap_or(stem);
            to_subtitle(entry, extra, "")
        })
        .collect()
}

/// Subtitles of an episode: only files named after the episode's video.
/// `rel_dir` is the listing's directory relative to the show.
pub fn episode_subtitles(listing: &DirListing, video_stem: &str, rel_dir: &str) -> Subtitles {
    listing
        .subtitles
        .iter()
        .filter_map(|entry| {
            let extra = belongs_to(video_stem, parser::file_stem(&entry.name))?;
            to_subtitle(entry, extra, rel_dir)
        })
        .collect()
}
