use reelbase_core::{ItemKind, ItemRef};
use serde::Serialize;

/// One searchable entry: a movie, a show or an episode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchDocument {
    pub id: String,
    /// Show id for episodes.
    pub parent_id: Option<String>,
    pub kind: ItemKind,
    pub name: String,
    /// Normalized full name, compared as a whole for exact-title hits.
    pub name_exact: String,
    pub sort_name: String,
    pub overview: String,
    pub genres: Vec<String>,
    pub year: Option<i32>,
}

impl SearchDocument {
    pub fn new(id: impl Into<String>, kind: ItemKind, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            parent_id: None,
            kind,
            name_exact: normalize(&name),
            sort_name: reelbase_core::make_sort_name(&name),
            name,
            overview: String::new(),
            genres: Vec::new(),
            year: None,
        }
    }

    /// Document for a movie, show or episode. Seasons are not searchable.
    pub fn from_item(item: ItemRef<'_>, parent_id: Option<&str>) -> Option<Self> {
        if matches!(item, ItemRef::Season(_)) {
            return None;
        }
        let meta = item.metadata()?;
        Some(Self {
            id: item.id().to_string(),
            parent_id: parent_id.map(str::to_string),
            kind: item.kind(),
            name: item.name().to_string(),
            name_exact: normalize(item.name()),
            sort_name: item.sort_name().to_string(),
            overview: meta.plot_or_empty().to_string(),
            genres: meta.genres.iter().cloned().collect(),
            year: meta.effective_year(),
        })
    }
}

/// Lowercase, turn every run of non-alphanumerics into one space, trim.
pub fn normalize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_space = true;
    for ch in value.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_space = false;
        } else if matches!(ch, '\'' | '\u{2019}') {
            // "Don't" -> "dont"
            continue;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out.trim_end().to_string()
}

pub fn tokenize(value: &str) -> Vec<String> {
    normalize(value)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
