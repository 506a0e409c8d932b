//! Artwork lookup by well-known file stems.

use reelbase_core::Artwork;

use crate::walk::{DirListing, join_rel};

fn find(listing: &DirListing, rel_dir: &str, stems: &[&str]) -> Option<String> {
    listing
        .image(stems)
        .map(|img| join_rel(rel_dir, &img.name))
}

/// Artwork of a movie directory. Names prefixed with the video stem
/// (`Movie-poster.jpg`) win over the generic ones.
pub fn movie_artwork(listing: &DirListing, video_stem: &str) -> Artwork {
    let prefixed = |suffix: &str| format!("{video_stem}-{suffix}");
    let (poster, fanart, banner, logo, clearlogo) = (
        prefixed("poster"),
        prefixed("fanart"),
        prefixed("banner"),
        prefixed("logo"),
        prefixed("clearlogo"),
    );
    Artwork {
        poster: find(listing, "", &[poster.as_str(), "poster", "cover", "folder", video_stem]),
        fanart: find(listing, "", &[fanart.as_str(), "fanart", "backdrop", "background"]),
        banner: find(listing, "", &[banner.as_str(), "banner"]),
        logo: find(listing, "", &[logo.as_str(), clearlogo.as_str(), "logo", "clearlogo"]),
        folder: find(listing, "", &["folder"]),
    }
}

/// Artwork of a show directory.
pub fn show_artwork(listing: &DirListing) -> Artwork {
    Artwork {
        poster: find(listing, "", &["poster", "cover", "folder"]),
        fanart: find(listing, "", &["fanart", "backdrop", "background"]),
        banner: find(listing, "", &["banner"]),
        logo: find(listing, "", &["logo", "clearlogo"]),
        folder: find(listing, "", &["folder"]),
    }
}

/// `season-all-poster` and `season-all-banner` in the show directory.
pub fn season_all(listing: &DirListing) -> (Option<String>, Option<String>) {
    (
        find(listing, "", &["season-all-poster", "season-all"]),
        find(listing, "", &["season-all-banner"]),
    )
}

/// Season images, all relative to the show directory.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeasonArt {
    pub poster: Option<String>,
    pub banner: Option<String>,
    pub fanart: Option<String>,
}

/// Season artwork from `seasonNN-*` files in the show directory, then from
/// plain `poster`/`banner`/`fanart` files inside the season directory.
pub fn season_artwork(
    show: &DirListing,
    season_dir: Option<(&DirListing, &str)>,
    season_no: u32,
) -> SeasonArt {
    let prefix = if season_no == 0 {
        "season-specials".to_string()
    } else {
        format!("season{season_no:02}")
    };
    let named = |kind: &str| find(show, "", &[format!("{prefix}-{kind}").as_str()]);
    let inner = |stems: &[&str]| season_dir.and_then(|(listing, rel)| find(listing, rel, stems));

    SeasonArt {
        poster: named("poster").or_else(|| inner(&["poster", "folder", "cover"])),
        banner: named("banner").or_else(|| inner(&["banner"])),
        fanart: named("fanart").or_else(|| inner(&["fanart", "backdrop"])),
    }
}

/// Episode thumbnail: `<stem>-thumb.*` or an image with the video's stem.
pub fn episode_thumb(listing: &DirListing, video_stem: &str, rel_dir: &str) -> Option<String> {
    let thumb = format!("{video_stem}-thumb");
    find(listing, rel_dir, &[thumb.as_str(), video_stem])
}
