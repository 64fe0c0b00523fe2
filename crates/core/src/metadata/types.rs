//! Types for release metadata extraction.

/// Structured metadata parsed from a release file name.
///
/// Every field except `proper` is optional: a missing field means
/// "undetermined", not an error, and comparison logic must treat absence
/// as "not comparable" rather than as a mismatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeMeta {
    /// Series title as written in the release name, separators cleaned.
    pub title: Option<String>,
    /// Season number, when the name carries one.
    pub season: Option<u32>,
    /// Episode number, when the name carries one.
    pub episode: Option<u32>,
    /// Screen size tag such as "720p" or "1080p", lowercased.
    pub resolution: Option<String>,
    /// Whether the name carries a proper/repack release tag.
    pub proper: bool,
}

impl EpisodeMeta {
    /// True when both a title and an episode number were determined,
    /// the minimum needed to compare two releases of the same episode.
    pub fn is_comparable(&self) -> bool {
        self.title.is_some() && self.episode.is_some()
    }

    /// Title normalized for comparison (lowercased), if present.
    pub fn title_key(&self) -> Option<String> {
        self.title.as_ref().map(|t| t.to_lowercase())
    }
}
