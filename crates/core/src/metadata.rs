use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

/// Descriptive metadata of an item, usually read from a sidecar descriptor.
///
/// Every field is optional; a missing descriptor yields `Metadata::default()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub sort_title: Option<String>,
    pub plot: Option<String>,
    pub tagline: Option<String>,
    pub year: Option<i32>,
    pub genres: BTreeSet<String>,
    pub studios: BTreeSet<String>,
    pub people: Vec<Person>,
    pub rating: Option<f32>,
    pub official_rating: Option<String>, // MPAA, BBFC, etc.
    pub premiered: Option<NaiveDate>,
    pub aired: Option<NaiveDate>,
    pub runtime_minutes: Option<u32>,
    pub provider_ids: BTreeMap<String, String>,
    pub stream: StreamDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub name: String,
    pub role: String, // "Actor", "Director", "Writer"
    pub character: Option<String>,
    pub thumb: Option<String>,
}

/// Technical stream details as recorded by the descriptor's `fileinfo` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamDetails {
    pub duration_secs: Option<u64>,
    pub video_codec: Option<String>,
    pub video_width: Option<u32>,
    pub video_height: Option<u32>,
    pub audio_codec: Option<String>,
    pub audio_channels: Option<u32>,
    pub audio_language: Option<String>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Runtime of the media, preferring the measured stream duration over the
    /// descriptor's nominal runtime.
    pub fn duration(&self) -> Duration {
        if let Some(secs) = self.stream.duration_secs {
            return Duration::from_secs(secs);
        }
        self.runtime_minutes
            .map(|m| Duration::from_secs(u64::from(m) * 60))
            .unwrap_or_default()
    }

    /// Year of release, falling back to the premiere or air date.
    pub fn effective_year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.year
            .or_else(|| self.premiered.map(|d| d.year()))
            .or_else(|| self.aired.map(|d| d.year()))
    }

    pub fn plot_or_empty(&self) -> &str {
        self.plot.as_deref().unwrap_or("")
    }

    pub fn actors(&self) -> impl Iterator<Item = &Person> {
        self.people.iter().filter(|p| p.role == "Actor")
    }
}
