//! End-to-end run tests.
//!
//! Drives full runs (snapshot -> reconcile -> collect) over real temp
//! directories with the mock torrent client, covering the file lifecycle
//! across consecutive runs.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::fs;

use seedshelf_core::config::{
    Config, DirectoriesConfig, EventsConfig, LedgerConfig, LockConfig, TransmissionConfig,
};
use seedshelf_core::ledger::CopiedLedger;
use seedshelf_core::testing::MockTorrentClient;
use seedshelf_core::torrent_client::{TorrentClient, TorrentStatus, TorrentSummary};
use seedshelf_core::{FsOps, GarbageCollector, GcStats, ReconcileStats, Reconciler, SqliteLedger};

struct TestHarness {
    _temp: TempDir,
    config: Config,
    client: MockTorrentClient,
    ledger: SqliteLedger,
}

impl TestHarness {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let seeding = temp.path().join("seeding");
        let extracted = temp.path().join("extracted");
        let destination = temp.path().join("tv");
        std::fs::create_dir_all(&seeding).unwrap();
        std::fs::create_dir_all(&extracted).unwrap();
        std::fs::create_dir_all(&destination).unwrap();

        let ledger = SqliteLedger::new(&temp.path().join("ledger.db")).unwrap();

        let config = Config {
            directories: DirectoriesConfig {
                seeding,
                extracted,
                destination,
            },
            transmission: TransmissionConfig {
                host: "localhost".to_string(),
                port: 9091,
                user: None,
                password: None,
                connect_attempts: 1,
                connect_delay_secs: 0,
                timeout_secs: 5,
            },
            overrides: Vec::new(),
            events: EventsConfig::default(),
            ledger: LedgerConfig::default(),
            lock: LockConfig::default(),
        };

        Self {
            _temp: temp,
            config,
            client: MockTorrentClient::new(),
            ledger,
        }
    }

    fn seeding(&self) -> &Path {
        &self.config.directories.seeding
    }

    fn destination(&self) -> &Path {
        &self.config.directories.destination
    }

    /// One full run: snapshot, reconcile, collect.
    async fn run(&self, dry_run: bool) -> (ReconcileStats, GcStats) {
        let ops = FsOps::new(dry_run);
        let snapshot = self.client.list_managed_files().await.unwrap();
        let stats = Reconciler::new(&self.config, &snapshot, &self.ledger, &ops)
            .run()
            .await;
        let gc_stats = GarbageCollector::new(
            self.seeding(),
            &snapshot,
            &self.ledger,
            &self.client,
            &ops,
        )
        .run()
        .await;
        (stats, gc_stats)
    }
}

async fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.unwrap();
    }
    fs::write(path, contents).await.unwrap();
}

#[tokio::test]
async fn test_file_lifecycle_across_runs() {
    let harness = TestHarness::new();
    let source = harness.seeding().join("The.Office.S03E17.720p.HDTV.mkv");
    write_file(&source, "episode data").await;
    harness.client.add_seeding_file(&source).await;

    // Run 1: still seeding, first sighting. The file is copied into the
    // library and the source stays for the client to keep uploading.
    let (stats, gc_stats) = harness.run(false).await;
    assert_eq!(stats.copied, 1);
    assert_eq!(gc_stats, GcStats::default());

    let target = harness
        .destination()
        .join("The Office/Season 3/The.Office.S03E17.720p.HDTV.mkv");
    assert!(target.exists());
    assert!(source.exists());
    assert!(harness.ledger.contains(&source).unwrap());

    // Run 2: nothing changed. No second copy happens.
    let (stats, _) = harness.run(false).await;
    assert_eq!(stats.copied, 0);

    // The client drops the torrent. Run 3 reclaims the source and the
    // ledger entry; the library copy is untouched.
    let harness2 = TestHarness {
        client: MockTorrentClient::new(),
        ..harness
    };
    let (_, gc_stats) = harness2.run(false).await;
    assert_eq!(gc_stats.pruned_entries, 1);
    assert!(!source.exists());
    assert!(target.exists());
    assert!(!harness2.ledger.contains(&source).unwrap());

    // Run 4: everything settled, full no-op.
    let (stats, gc_stats) = harness2.run(false).await;
    assert_eq!(stats.discovered, 0);
    assert!(gc_stats.is_noop());
}

#[tokio::test]
async fn test_moved_proper_supersedes_library_copy() {
    let harness = TestHarness::new();

    let old_target = harness
        .destination()
        .join("The Office/Season 3/The.Office.S03E17.720p.HDTV.mkv");
    write_file(&old_target, "defective release").await;
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;

    // The proper is no longer seeded and not ledgered, so it is moved in;
    // placement then deletes the older release it replaces.
    let proper = harness
        .seeding()
        .join("The.Office.S03E17.PROPER.720p.HDTV.mkv");
    write_file(&proper, "fixed release").await;

    let (stats, _) = harness.run(false).await;

    assert_eq!(stats.moved, 1);
    assert!(!proper.exists());
    assert!(!old_target.exists());
    assert!(harness
        .destination()
        .join("The Office/Season 3/The.Office.S03E17.PROPER.720p.HDTV.mkv")
        .exists());
}

#[tokio::test]
async fn test_finished_torrent_is_removed_from_client() {
    let harness = TestHarness::new();
    let source = harness.seeding().join("Archer.S01E02.1080p.WEB.mkv");
    write_file(&source, "episode").await;
    harness.client.add_seeding_file(&source).await;
    harness
        .client
        .add_mock_torrent(TorrentSummary {
            id: 11,
            name: "Archer.S01E02.1080p.WEB.mkv".to_string(),
            download_dir: harness.seeding().to_path_buf(),
            status: TorrentStatus::Stopped,
            progress: 1.0,
        })
        .await;

    let (stats, gc_stats) = harness.run(false).await;

    // Copied while the snapshot still lists it, then the finished torrent
    // is dropped from the client and its ledgered data reclaimed.
    assert_eq!(stats.copied, 1);
    assert_eq!(gc_stats.removed_torrents, 1);
    assert_eq!(gc_stats.deleted_data, 1);
    assert_eq!(harness.client.removed_torrents().await, vec![(11, false)]);
    assert!(!source.exists());
    assert!(harness
        .destination()
        .join("Archer/Season 1/Archer.S01E02.1080p.WEB.mkv")
        .exists());
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let harness = TestHarness::new();
    let seeded = harness.seeding().join("The.Office.S03E17.720p.HDTV.mkv");
    write_file(&seeded, "episode").await;
    harness.client.add_seeding_file(&seeded).await;
    let orphan = harness.seeding().join("Archer.S01E02.1080p.WEB.mkv");
    write_file(&orphan, "episode").await;

    let (stats, _) = harness.run(true).await;

    assert_eq!(stats.copied, 1);
    assert_eq!(stats.moved, 1);
    assert!(seeded.exists());
    assert!(orphan.exists());
    assert!(!harness.destination().join("The Office").exists());
    assert!(!harness.destination().join("Archer").exists());
    assert_eq!(harness.ledger.all().unwrap(), Vec::<PathBuf>::new());
}
