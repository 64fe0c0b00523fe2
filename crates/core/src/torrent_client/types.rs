//! Types for torrent client operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(i64),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,
}

/// State of a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentStatus {
    /// Torrent is stopped.
    Stopped,
    /// Checking file integrity (or queued to).
    Checking,
    /// Downloading from peers (or queued to).
    Downloading,
    /// Seeding to peers (or queued to).
    Seeding,
    /// Unknown state.
    Unknown,
}

impl TorrentStatus {
    /// Returns the string representation for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentStatus::Stopped => "stopped",
            TorrentStatus::Checking => "checking",
            TorrentStatus::Downloading => "downloading",
            TorrentStatus::Seeding => "seeding",
            TorrentStatus::Unknown => "unknown",
        }
    }
}

/// One torrent as reported by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentSummary {
    /// Client-assigned torrent id.
    pub id: i64,
    /// Torrent name; also the root file or directory name on disk.
    pub name: String,
    /// Directory the torrent downloads into.
    pub download_dir: PathBuf,
    /// Current state.
    pub status: TorrentStatus,
    /// Download progress (0.0 - 1.0).
    pub progress: f64,
}

impl TorrentSummary {
    /// Path of the torrent's root file or directory on disk.
    pub fn content_path(&self) -> PathBuf {
        self.download_dir.join(&self.name)
    }

    /// True when the torrent finished downloading and was stopped,
    /// meaning the client is done with it.
    pub fn is_complete_and_stopped(&self) -> bool {
        self.status == TorrentStatus::Stopped && self.progress >= 1.0
    }
}

/// Immutable per-run capture of everything the torrent client manages.
///
/// Taken once at the start of a run and used only for membership tests;
/// actions taken during the run may drift the client's real state away
/// from this snapshot, and that is fine.
#[derive(Debug, Clone, Default)]
pub struct SeedingSnapshot {
    files: HashSet<PathBuf>,
    dirs: HashSet<PathBuf>,
}

impl SeedingSnapshot {
    pub fn new(files: HashSet<PathBuf>, dirs: HashSet<PathBuf>) -> Self {
        Self { files, dirs }
    }

    /// Whether the client manages this exact file path.
    pub fn is_seeding(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    /// Whether the client manages this torrent root directory.
    pub fn is_seeding_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }
}

/// Trait for torrent client backends.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Capture the set of files and torrent root directories the client
    /// currently manages.
    async fn list_managed_files(&self) -> Result<SeedingSnapshot, TorrentClientError>;

    /// List all torrents.
    async fn list_torrents(&self) -> Result<Vec<TorrentSummary>, TorrentClientError>;

    /// Remove a torrent from the client.
    /// If `delete_data` is true, also delete downloaded files.
    async fn remove_torrent(&self, id: i64, delete_data: bool)
        -> Result<(), TorrentClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(TorrentStatus::Stopped.as_str(), "stopped");
        assert_eq!(TorrentStatus::Seeding.as_str(), "seeding");
        assert_eq!(TorrentStatus::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_content_path() {
        let summary = TorrentSummary {
            id: 1,
            name: "Show.S01E01.720p".to_string(),
            download_dir: PathBuf::from("/srv/seeding"),
            status: TorrentStatus::Seeding,
            progress: 1.0,
        };
        assert_eq!(
            summary.content_path(),
            PathBuf::from("/srv/seeding/Show.S01E01.720p")
        );
    }

    #[test]
    fn test_complete_and_stopped() {
        let mut summary = TorrentSummary {
            id: 1,
            name: "x".to_string(),
            download_dir: PathBuf::from("/srv/seeding"),
            status: TorrentStatus::Stopped,
            progress: 1.0,
        };
        assert!(summary.is_complete_and_stopped());

        summary.progress = 0.9;
        assert!(!summary.is_complete_and_stopped());

        summary.progress = 1.0;
        summary.status = TorrentStatus::Seeding;
        assert!(!summary.is_complete_and_stopped());
    }

    #[test]
    fn test_snapshot_membership() {
        let files: HashSet<_> = [PathBuf::from("/srv/seeding/a/ep1.mkv")].into();
        let dirs: HashSet<_> = [PathBuf::from("/srv/seeding/a")].into();
        let snapshot = SeedingSnapshot::new(files, dirs);

        assert!(snapshot.is_seeding(Path::new("/srv/seeding/a/ep1.mkv")));
        assert!(!snapshot.is_seeding(Path::new("/srv/seeding/a/ep2.mkv")));
        assert!(snapshot.is_seeding_dir(Path::new("/srv/seeding/a")));
        assert!(!snapshot.is_seeding_dir(Path::new("/srv/seeding/b")));
    }
}
