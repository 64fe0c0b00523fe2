//! Release metadata extraction.
//!
//! This is the in-tree metadata provider: a regex-based parser that pulls
//! title, season, episode, screen size and the proper/repack flag out of a
//! release file name. Missing fields mean "undetermined", never an error.

mod parser;
mod types;

pub use parser::parse_release;
pub use types::EpisodeMeta;

use std::path::Path;

/// File extensions treated as video content.
pub const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "ogm", "ts"];

/// Whether the path has a recognized video extension.
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_lowercase();
            VIDEO_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file(Path::new("/x/Show.S01E01.mkv")));
        assert!(is_video_file(Path::new("/x/Show.S01E01.MKV")));
        assert!(is_video_file(Path::new("ep.ts")));
        assert!(!is_video_file(Path::new("/x/Show.S01E01.rar")));
        assert!(!is_video_file(Path::new("/x/noext")));
    }
}
