//! Mock torrent client for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::torrent_client::{
    SeedingSnapshot, TorrentClient, TorrentClientError, TorrentSummary,
};

/// Mock implementation of the TorrentClient trait.
///
/// Provides controllable behavior for testing:
/// - Pre-populate the seeding snapshot and torrent list
/// - Track remove_torrent calls for assertions
/// - Simulate failures
#[derive(Debug, Default)]
pub struct MockTorrentClient {
    seeding_files: Arc<RwLock<HashSet<PathBuf>>>,
    seeding_dirs: Arc<RwLock<HashSet<PathBuf>>>,
    torrents: Arc<RwLock<Vec<TorrentSummary>>>,
    /// Recorded remove_torrent calls as (id, delete_data).
    removed: Arc<RwLock<Vec<(i64, bool)>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TorrentClientError>>>,
}

impl MockTorrentClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a file path as managed by the client.
    pub async fn add_seeding_file(&self, path: impl Into<PathBuf>) {
        self.seeding_files.write().await.insert(path.into());
    }

    /// Mark a torrent root directory as managed by the client.
    pub async fn add_seeding_dir(&self, path: impl Into<PathBuf>) {
        self.seeding_dirs.write().await.insert(path.into());
    }

    /// Pre-populate a torrent for list_torrents.
    pub async fn add_mock_torrent(&self, summary: TorrentSummary) {
        self.torrents.write().await.push(summary);
    }

    /// Get all recorded remove_torrent calls.
    pub async fn removed_torrents(&self) -> Vec<(i64, bool)> {
        self.removed.read().await.clone()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        *self.next_error.write().await = Some(error);
    }

    async fn take_error(&self) -> Option<TorrentClientError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_managed_files(&self) -> Result<SeedingSnapshot, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(SeedingSnapshot::new(
            self.seeding_files.read().await.clone(),
            self.seeding_dirs.read().await.clone(),
        ))
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentSummary>, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(self.torrents.read().await.clone())
    }

    async fn remove_torrent(
        &self,
        id: i64,
        delete_data: bool,
    ) -> Result<(), TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let mut torrents = self.torrents.write().await;
        let before = torrents.len();
        torrents.retain(|t| t.id != id);
        if torrents.len() == before {
            return Err(TorrentClientError::TorrentNotFound(id));
        }
        self.removed.write().await.push((id, delete_data));
        Ok(())
    }
}
