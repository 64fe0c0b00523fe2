//! Post-pass garbage collection.
//!
//! Runs after the reconciler, driven by the same per-run seeding snapshot.
//! Three sweeps:
//! 1. extraction leftovers: seeding subdirectories that were extracted
//!    (sentinel present) and have dropped out of the seeding set;
//! 2. finished torrents: complete and stopped torrents rooted at the
//!    seeding path are removed from the client, and their data deleted
//!    when a copy of it already lives in the library;
//! 3. stale ledger entries: paths the client no longer seeds lose their
//!    source file and their ledger entry.
//!
//! With an unchanged snapshot a second run finds nothing to do.

use std::path::Path;

use tokio::fs;
use tracing::{debug, error, info};

use crate::fsops::FsOps;
use crate::ledger::CopiedLedger;
use crate::torrent_client::{SeedingSnapshot, TorrentClient};
use crate::unpack::EXTRACTED_SENTINEL;

/// Counters for one collection pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GcStats {
    /// Extraction directories deleted by sweep 1.
    pub removed_dirs: usize,
    /// Torrents removed from the client by sweep 2.
    pub removed_torrents: usize,
    /// Torrent data trees/files deleted by sweep 2.
    pub deleted_data: usize,
    /// Ledger entries pruned by sweep 3.
    pub pruned_entries: usize,
    pub failed: usize,
}

impl GcStats {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

pub struct GarbageCollector<'a> {
    seeding_root: &'a Path,
    snapshot: &'a SeedingSnapshot,
    ledger: &'a dyn CopiedLedger,
    client: &'a dyn TorrentClient,
    ops: &'a FsOps,
}

impl<'a> GarbageCollector<'a> {
    pub fn new(
        seeding_root: &'a Path,
        snapshot: &'a SeedingSnapshot,
        ledger: &'a dyn CopiedLedger,
        client: &'a dyn TorrentClient,
        ops: &'a FsOps,
    ) -> Self {
        Self {
            seeding_root,
            snapshot,
            ledger,
            client,
            ops,
        }
    }

    pub async fn run(&self) -> GcStats {
        let mut stats = GcStats::default();
        self.sweep_extracted_dirs(&mut stats).await;
        self.sweep_finished_torrents(&mut stats).await;
        self.sweep_stale_ledger_entries(&mut stats).await;
        stats
    }

    /// Sweep 1: extracted torrent directories the client dropped.
    async fn sweep_extracted_dirs(&self, stats: &mut GcStats) {
        let mut entries = match fs::read_dir(self.seeding_root).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to list {}: {}", self.seeding_root.display(), e);
                stats.failed += 1;
                return;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !path.is_dir() || !path.join(EXTRACTED_SENTINEL).exists() {
                continue;
            }
            if self.snapshot.is_seeding_dir(&path) {
                continue;
            }
            info!("Deleting no longer seeded extracted dir: {}", path.display());
            match self.ops.remove_dir_all(&path).await {
                Ok(()) => stats.removed_dirs += 1,
                Err(e) => {
                    error!("{}", e);
                    stats.failed += 1;
                }
            }
        }
    }

    /// Sweep 2: torrents the client is done with.
    ///
    /// The torrent is always dropped from the client; its data is only
    /// deleted when the library already holds a copy, which is the case
    /// for extracted (sentinel-marked) directories and ledgered files.
    /// Data placed by a direct move has already left the seeding root.
    async fn sweep_finished_torrents(&self, stats: &mut GcStats) {
        let torrents = match self.client.list_torrents().await {
            Ok(torrents) => torrents,
            Err(e) => {
                error!("Failed to list torrents: {}", e);
                stats.failed += 1;
                return;
            }
        };

        for torrent in torrents {
            if !torrent.is_complete_and_stopped() {
                continue;
            }
            // Only torrents downloading straight into the managed root;
            // a subdirectory means someone else's torrent.
            if torrent.download_dir.as_path() != self.seeding_root {
                debug!(
                    "Ignoring finished torrent outside seeding root: {}",
                    torrent.download_dir.display()
                );
                continue;
            }
            let content = torrent.content_path();

            if self.ops.is_dry_run() {
                info!("Would remove torrent from client: {}", torrent.name);
            } else {
                info!("Removing torrent from client: {}", torrent.name);
                if let Err(e) = self.client.remove_torrent(torrent.id, false).await {
                    error!("Failed to remove torrent {}: {}", torrent.name, e);
                    stats.failed += 1;
                    continue;
                }
            }
            stats.removed_torrents += 1;

            let reclaimable = if content.is_dir() {
                content.join(EXTRACTED_SENTINEL).exists()
            } else {
                self.ledger.contains(&content).unwrap_or(false)
            };
            if !reclaimable {
                debug!("Leaving torrent data in place: {}", content.display());
                continue;
            }

            let removal = if content.is_dir() {
                self.ops.remove_dir_all(&content).await
            } else {
                self.ops.remove_file(&content).await
            };
            match removal {
                Ok(()) => {
                    info!("Deleted torrent data: {}", content.display());
                    stats.deleted_data += 1;
                }
                Err(e) => {
                    error!("{}", e);
                    stats.failed += 1;
                }
            }
        }
    }

    /// Sweep 3: ledger entries whose source left the seeding set. The
    /// entry goes away even when the source file is already gone.
    async fn sweep_stale_ledger_entries(&self, stats: &mut GcStats) {
        let entries = match self.ledger.all() {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to list ledger entries: {}", e);
                stats.failed += 1;
                return;
            }
        };

        for path in entries {
            if self.snapshot.is_seeding(&path) {
                continue;
            }

            if path.exists() {
                info!("Deleting already copied file: {}", path.display());
                if let Err(e) = self.ops.remove_file(&path).await {
                    error!("{}", e);
                    stats.failed += 1;
                    continue;
                }
            }

            if self.ops.is_dry_run() {
                info!("Would prune ledger entry: {}", path.display());
            } else {
                debug!("Pruning ledger entry: {}", path.display());
                if let Err(e) = self.ledger.remove(&path) {
                    error!("{}", e);
                    stats.failed += 1;
                    continue;
                }
            }
            stats.pruned_entries += 1;
        }
    }
}
