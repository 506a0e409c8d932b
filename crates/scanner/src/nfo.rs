//! Kodi-style `.nfo` descriptor parsing.
//!
//! Handles `movie`, `tvshow` and `episodedetails` roots alike: the root name is
//! not checked, only its children. Unknown elements are skipped. For files
//! holding several roots (multi-episode descriptors) the first value of a
//! scalar field wins and list fields are merged.

use std::path::Path;

use chrono::NaiveDate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use reelbase_core::{LibraryError, Metadata, Person};

#[derive(Debug, thiserror::Error)]
pub enum NfoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("xml error: {0}")]
    Xml(String),

    #[error("unexpected end of document inside <{0}>")]
    Truncated(String),
}

impl NfoError {
    pub fn into_library_error(self, path: &Path) -> LibraryError {
        LibraryError::MalformedMetadata {
            path: path.display().to_string(),
            reason: self.to_string(),
        }
    }
}

/// An element currently open in the document.
struct Frame {
    name: String,
    text: String,
    kind: Option<String>,
    is_default: bool,
}

impl Frame {
    fn open(e: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
        let mut kind = None;
        let mut is_default = false;
        for attr in e.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value).trim().to_string();
            match attr.key.as_ref() {
                b"type" | b"name" => kind = Some(value.to_ascii_lowercase()),
                b"default" => is_default = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }
        Self {
            name,
            text: String::new(),
            kind,
            is_default,
        }
    }
}

#[derive(Default)]
struct PersonDraft {
    name: String,
    character: Option<String>,
    thumb: Option<String>,
}

#[derive(Default)]
struct NfoBuilder {
    meta: Metadata,
    outline: Option<String>,
    actor: Option<PersonDraft>,
    // <ratings> block value, used only when no plain <rating> exists
    fallback_rating: Option<f32>,
    in_default_rating: bool,
}

fn set_once<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn non_empty(text: &str) -> Option<String> {
    let t = text.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    // also accepts "2010-07-16 00:00:00"
    let t = text.trim();
    NaiveDate::parse_from_str(t.get(..10).unwrap_or(t), "%Y-%m-%d").ok()
}

fn parse_leading_u32(text: &str) -> Option<u32> {
    let digits: String = text.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn parse_float(text: &str) -> Option<f32> {
    text.trim().replace(',', ".").parse::<f32>().ok().filter(|r| r.is_finite())
}

impl NfoBuilder {
    fn start(&mut self, path: &[&str], frame: &Frame) {
        match path {
            [_, "actor"] => self.actor = Some(PersonDraft::default()),
            [_, "ratings", "rating"] => self.in_default_rating = frame.is_default,
            _ => {}
        }
    }

    fn end(&mut self, path: &[&str], frame: &Frame) {
        let text = frame.text.as_str();
        let meta = &mut self.meta;
        match path {
            [_, "title"] => set_once(&mut meta.title, non_empty(text)),
            [_, "originaltitle"] => set_once(&mut meta.original_title, non_empty(text)),
            [_, "sorttitle"] => set_once(&mut meta.sort_title, non_empty(text)),
            [_, "plot"] => set_once(&mut meta.plot, non_empty(text)),
            [_, "outline"] => set_once(&mut self.outline, non_empty(text)),
            [_, "tagline"] => set_once(&mut meta.tagline, non_empty(text)),
            [_, "year"] => set_once(
                &mut meta.year,
                text.trim().parse::<i32>().ok().filter(|y| (1800..=3000).contains(y)),
            ),
            [_, "genre"] => meta.genres.extend(text.split('/').filter_map(non_empty)),
            [_, "studio"] => meta.studios.extend(non_empty(text)),
            [_, "rating"] => set_once(&mut meta.rating, parse_float(text)),
            [_, "ratings", "rating", "value"] => {
                if self.in_default_rating {
                    self.fallback_rating = parse_float(text).or(self.fallback_rating);
                } else {
                    set_once(&mut self.fallback_rating, parse_float(text));
                }
            }
            [_, "mpaa"] | [_, "certification"] => {
                set_once(&mut meta.official_rating, non_empty(text))
            }
            [_, "premiered"] | [_, "releasedate"] => set_once(&mut meta.premiered, parse_date(text)),
            [_, "aired"] => set_once(&mut meta.aired, parse_date(text)),
            [_, "runtime"] => set_once(
                &mut meta.runtime_minutes,
                parse_leading_u32(text).filter(|m| *m > 0),
            ),
            [_, "uniqueid"] => {
                if let (Some(kind), Some(value)) = (&frame.kind, non_empty(text)) {
                    meta.provider_ids.entry(kind.clone()).or_insert(value);
                }
            }
            [_, "imdbid"] | [_, "imdb_id"] => {
                if let Some(value) = non_empty(text) {
                    meta.provider_ids.entry("imdb".into()).or_insert(value);
                }
            }
            [_, "tmdbid"] => {
                if let Some(value) = non_empty(text) {
                    meta.provider_ids.entry("tmdb".into()).or_insert(value);
                }
            }
            [_, "director"] => push_person(meta, text, "Director"),
            [_, "credits"] | [_, "writer"] => push_person(meta, text, "Writer"),
            [_, "actor", "name"] => {
                if let Some(actor) = self.actor.as_mut() {
                    actor.name = text.trim().to_string();
                }
            }
            [_, "actor", "role"] => {
                if let Some(actor) = self.actor.as_mut() {
                    actor.character = non_empty(text);
                }
            }
            [_, "actor", "thumb"] => {
                if let Some(actor) = self.actor.as_mut() {
                    actor.thumb = non_empty(text);
                }
            }
            [_, "actor"] => {
                if let Some(actor) = self.actor.take().filter(|a| !a.name.is_empty()) {
                    meta.people.push(Person {
                        name: actor.name,
                        role: "Actor".into(),
                        character: actor.character,
                        thumb: actor.thumb,
                    });
                }
            }
            [_, "fileinfo", "streamdetails", "video", field] => {
                let stream = &mut meta.stream;
                match *field {
                    "codec" => set_once(&mut stream.video_codec, non_empty(text)),
                    "width" => set_once(&mut stream.video_width, parse_leading_u32(text)),
                    "height" => set_once(&mut stream.video_height, parse_leading_u32(text)),
                    "durationinseconds" => set_once(
                        &mut stream.duration_secs,
                        parse_leading_u32(text).map(u64::from).filter(|s| *s > 0),
                    ),
                    _ => {}
                }
            }
            [_, "fileinfo", "streamdetails", "audio", field] => {
                let stream = &mut meta.stream;
                match *field {
                    "codec" => set_once(&mut stream.audio_codec, non_empty(text)),
                    "channels" => set_once(&mut stream.audio_channels, parse_leading_u32(text)),
                    "language" => set_once(&mut stream.audio_language, non_empty(text)),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Metadata {
        if self.meta.plot.is_none() {
            self.meta.plot = self.outline;
        }
        if self.meta.rating.is_none() {
            self.meta.rating = self.fallback_rating;
        }
        self.meta
    }
}

fn push_person(meta: &mut Metadata, text: &str, role: &str) {
    for name in text.split('/').filter_map(non_empty) {
        if !meta.people.iter().any(|p| p.name == name && p.role == role) {
            meta.people.push(Person {
                name,
                role: role.into(),
                character: None,
                thumb: None,
            });
        }
    }
}

/// Parse descriptor XML into `Metadata`.
pub fn parse_nfo(xml: &str) -> Result<Metadata, NfoError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut builder = NfoBuilder::default();
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                saw_root = true;
                let frame = Frame::open(&e);
                let mut path: Vec<&str> = stack.iter().map(|f| f.name.as_str()).collect();
                path.push(&frame.name);
                builder.start(&path, &frame);
                stack.push(frame);
            }
            Ok(Event::End(_)) => {
                let Some(frame) = stack.pop() else {
                    return Err(NfoError::Xml("unexpected closing tag".into()));
                };
                let mut path: Vec<&str> = stack.iter().map(|f| f.name.as_str()).collect();
                path.push(&frame.name);
                builder.end(&path, &frame);
            }
            Ok(Event::Empty(_)) => saw_root = true,
            Ok(Event::Text(e)) => {
                if let Some(frame) = stack.last_mut() {
                    let text = e.unescape().map_err(|err| NfoError::Xml(err.to_string()))?;
                    frame.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(NfoError::Xml(format!(
                    "{err} at position {}",
                    reader.error_position()
                )));
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(NfoError::Truncated(open.name.clone()));
    }
    if !saw_root {
        return Err(NfoError::Xml("no root element".into()));
    }
    Ok(builder.finish())
}

/// Read and parse a descriptor file.
pub fn read_nfo(path: &Path) -> Result<Metadata, LibraryError> {
    let xml = std::fs::read(path).map_err(|e| NfoError::Io(e).into_library_error(path))?;
    let xml = String::from_utf8_lossy(&xml);
    let xml = xml.trim_start_matches('\u{feff}');
    parse_nfo(xml).map_err(|e| e.into_library_error(path))
}

/// Load a descriptor, recovering from any failure with default metadata.
pub fn load_nfo(path: &Path) -> Metadata {
    match read_nfo(path) {
        Ok(meta) => meta,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "malformed descriptor, using defaults");
            Metadata::default()
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const MOVIE_NFO: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
<movie>
    <title>The Matrix</title>
    <originaltitle>The Matrix</originaltitle>
    <sorttitle>Matrix 1</sorttitle>
    <outline>Short outline.</outline>
    <plot>A computer hacker learns the truth &amp; more.</plot>
    <year>1999</year>
    <runtime>136</runtime>
    <mpaa>Rated R</mpaa>
    <genre>Action / Science Fiction</genre>
    <genre>Action</genre>
    <studio>Warner Bros.</studio>
    <premiered>1999-03-30</premiered>
    <uniqueid type="imdb" default="true">tt0133093</uniqueid>
    <uniqueid type="tmdb">603</uniqueid>
    <ratings>
        <rating name="imdb" max="10"><value>8.7</value></rating>
        <rating name="tmdb" max="10" default="true"><value>8.2</value></rating>
    </ratings>
    <director>Lana Wachowski / Lilly Wachowski</director>
    <actor>
        <name>Keanu Reeves</name>
        <role>Neo</role>
        <thumb>http://example.invalid/keanu.jpg</thumb>
    </actor>
    <actor>
        <name></name>
        <role>Nobody</role>
    </actor>
    <set><name>The Matrix Collection</name></set>
    <fileinfo>
        <streamdetails>
            <video>
                <codec>h264</codec>
                <width>1920</width>
                <height>800</height>
                <durationinseconds>8160</durationinseconds>
            </video>
            <audio>
                <codec>dts</codec>
                <language>eng</language>
                <channels>6</channels>
            </audio>
        </streamdetails>
    </fileinfo>
    <unknownelement attr="x"><nested>ignored</nested></unknownelement>
</movie>
"#;

    #[test]
    fn parses_movie_descriptor() {
        let m = parse_nfo(MOVIE_NFO).unwrap();
        assert_eq!(m.title.as_deref(), Some("The Matrix"));
        assert_eq!(m.sort_title.as_deref(), Some("Matrix 1"));
        assert_eq!(m.plot.as_deref(), Some("A computer hacker learns the truth & more."));
        assert_eq!(m.year, Some(1999));
        assert_eq!(m.runtime_minutes, Some(136));
        assert_eq!(m.official_rating.as_deref(), Some("Rated R"));
        assert_eq!(
            m.genres.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Action", "Science Fiction"]
        );
        assert!(m.studios.contains("Warner Bros."));
        assert_eq!(m.premiered, NaiveDate::from_ymd_opt(1999, 3, 30));
        assert_eq!(m.provider_ids.get("imdb").map(String::as_str), Some("tt0133093"));
        assert_eq!(m.provider_ids.get("tmdb").map(String::as_str), Some("603"));
        assert_eq!(m.rating, Some(8.2));
    }

    #[test]
    fn parses_people() {
        let m = parse_nfo(MOVIE_NFO).unwrap();
        let actors: Vec<_> = m.actors().collect();
        assert_eq!(actors.len(), 1);
        assert_eq!(actors[0].name, "Keanu Reeves");
        assert_eq!(actors[0].character.as_deref(), Some("Neo"));
        let directors: Vec<_> = m.people.iter().filter(|p| p.role == "Director").collect();
        assert_eq!(directors.len(), 2);
    }

    #[test]
    fn parses_stream_details() {
        let m = parse_nfo(MOVIE_NFO).unwrap();
        assert_eq!(m.stream.video_codec.as_deref(), Some("h264"));
        assert_eq!(m.stream.video_width, Some(1920));
        assert_eq!(m.stream.duration_secs, Some(8160));
        assert_eq!(m.stream.audio_channels, Some(6));
        assert_eq!(m.stream.audio_language.as_deref(), Some("eng"));
        assert_eq!(m.duration().as_secs(), 8160);
    }

    #[test]
    fn nested_names_do_not_leak_into_title() {
        let m = parse_nfo("<movie><set><title>Set</title></set><title>Real</title></movie>").unwrap();
        assert_eq!(m.title.as_deref(), Some("Real"));
    }

    #[test]
    fn outline_used_when_plot_missing() {
        let m = parse_nfo("<tvshow><outline>Short</outline></tvshow>").unwrap();
        assert_eq!(m.plot.as_deref(), Some("Short"));
    }

    #[test]
    fn first_ratings_value_without_default() {
        let m = parse_nfo(
            "<movie><ratings><rating name=\"a\"><value>6,5</value></rating>\
             <rating name=\"b\"><value>9</value></rating></ratings></movie>",
        )
        .unwrap();
        assert_eq!(m.rating, Some(6.5));
    }

    #[test]
    fn multi_episode_descriptor_keeps_first_title() {
        let m = parse_nfo(
            "<episodedetails><title>One</title><aired>2015-03-08</aired></episodedetails>\
             <episodedetails><title>Two</title></episodedetails>",
        )
        .unwrap();
        assert_eq!(m.title.as_deref(), Some("One"));
        assert_eq!(m.aired, NaiveDate::from_ymd_opt(2015, 3, 8));
    }

    #[test]
    fn cdata_text() {
        let m = parse_nfo("<movie><plot><![CDATA[Tom & Jerry]]></plot></movie>").unwrap();
        assert_eq!(m.plot.as_deref(), Some("Tom & Jerry"));
    }

    #[test]
    fn mismatched_tags_are_errors() {
        assert!(matches!(
            parse_nfo("<movie><title>X</plot></movie>"),
            Err(NfoError::Xml(_))
        ));
    }

    #[test]
    fn unclosed_root_is_truncated() {
        assert!(matches!(
            parse_nfo("<movie><title>X</title>"),
            Err(NfoError::Truncated(name)) if name == "movie"
        ));
    }

    #[test]
    fn plain_text_is_not_a_descriptor() {
        assert!(parse_nfo("https://www.themoviedb.org/movie/603").is_err());
    }

    #[test]
    fn load_recovers_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("movie.nfo");
        std::fs::write(&bad, "<movie><title>Broken").unwrap();
        assert_eq!(load_nfo(&bad), Metadata::default());
        assert_eq!(load_nfo(&dir.path().join("missing.nfo")), Metadata::default());

        let err = read_nfo(&bad).unwrap_err();
        assert_eq!(err.code(), "malformed_metadata");
    }

    #[test]
    fn load_strips_byte_order_mark() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.nfo");
        std::fs::write(&path, "\u{feff}<movie><title>X</title></movie>").unwrap();
        assert_eq!(load_nfo(&path).title.as_deref(), Some("X"));
    }
}
