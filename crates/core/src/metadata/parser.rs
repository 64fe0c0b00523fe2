//! Release-name parser.
//!
//! Extracts series title, season/episode numbers, screen size and the
//! proper/repack flag from a scene-style file name. Fields that cannot be
//! determined are left as `None`.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::EpisodeMeta;

/// `S03E17` style episode markers.
static SEASON_EPISODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[\. _\-\[]s(\d{1,2})[\. _]?e(\d{1,3})").unwrap());

/// `3x17` style episode markers.
static CROSS_EPISODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[\. _\-\[](\d{1,2})x(\d{2,3})").unwrap());

/// Bare `E17` / `Ep17` markers (episode without a season).
static BARE_EPISODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[\. _\-\[]ep?(\d{1,3})[\. _\-\]]").unwrap());

static RESOLUTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[\. _\-\[](480p|540p|576p|720p|1080p|2160p)").unwrap());

static PROPER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[\. _\-](proper|repack)[\. _\-]").unwrap());

/// Tokens that terminate the title portion when no episode marker exists.
static QUALITY_BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)[\. _\-](480p|540p|576p|720p|1080p|2160p|x264|x265|h264|h265|hevc|xvid|hdtv|webrip|web-dl|web|bluray|brrip|dvdrip|proper|repack|internal|limited)([\. _\-]|$)",
    )
    .unwrap()
});

/// Parse a release file name into structured metadata.
///
/// Expects a base name, not a full path; the extension is ignored.
pub fn parse_release(file_name: &str) -> EpisodeMeta {
    let stem = strip_extension(file_name);

    let mut meta = EpisodeMeta {
        proper: PROPER_RE.is_match(stem),
        resolution: RESOLUTION_RE
            .captures(stem)
            .map(|c| c[1].to_lowercase()),
        ..EpisodeMeta::default()
    };

    // Title runs up to the first episode marker; without one, up to the
    // first quality token.
    let mut title_end = stem.len();

    if let Some(caps) = SEASON_EPISODE_RE.captures(stem) {
        meta.season = caps[1].parse().ok();
        meta.episode = caps[2].parse().ok();
        title_end = caps.get(0).map(|m| m.start()).unwrap_or(title_end);
    } else if let Some(caps) = CROSS_EPISODE_RE.captures(stem) {
        meta.season = caps[1].parse().ok();
        meta.episode = caps[2].parse().ok();
        title_end = caps.get(0).map(|m| m.start()).unwrap_or(title_end);
    } else if let Some(caps) = BARE_EPISODE_RE.captures(stem) {
        meta.episode = caps[1].parse().ok();
        title_end = caps.get(0).map(|m| m.start()).unwrap_or(title_end);
    } else if let Some(m) = QUALITY_BREAK_RE.find(stem) {
        title_end = m.start();
    }

    meta.title = clean_title(&stem[..title_end]);
    meta
}

fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        // A leading-dot name is all extension, no stem.
        Some(0) => "",
        Some(idx) => &file_name[..idx],
        None => file_name,
    }
}

/// Turns `"The.Office_(US)"` into `"The Office (US)"`; `None` when nothing
/// usable remains.
fn clean_title(raw: &str) -> Option<String> {
    let cleaned = raw
        .replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = cleaned.trim_matches(|c: char| c == '-' || c.is_whitespace());
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
