//! Per-run discovery of candidate video files.
//!
//! Walks the seeding root (extracting archives as a pre-step) and the
//! extraction root, producing the list of video files the reconciler
//! classifies. Everything here is recomputed every run.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tokio::fs;
use tracing::{error, info, warn};

use crate::fsops::{walk_files, FsOps};
use crate::metadata::is_video_file;
use crate::unpack::{self, EXTRACTED_SENTINEL};

/// `.sample.` / `-sample.` marked files.
static SAMPLE_FILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[\.\-]sample\.").unwrap());

/// What one discovery pass found.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Video files to reconcile, in stable (sorted) order.
    pub video_files: Vec<PathBuf>,
    /// Archives extracted during the pre-step.
    pub extracted_archives: usize,
}

fn is_sample(path: &Path) -> bool {
    let in_sample_dir = path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| s.eq_ignore_ascii_case("sample"))
            .unwrap_or(false)
    });
    let sample_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| SAMPLE_FILE_RE.is_match(n))
        .unwrap_or(false);
    in_sample_dir || sample_name
}

/// Extract archives found under one torrent directory, once.
///
/// The sentinel file marks a directory whose archives were already
/// extracted; it is written after the first successful extraction so
/// subsequent runs skip the directory entirely.
async fn extract_pending_archives(
    torrent_dir: &Path,
    extraction_root: &Path,
    ops: &FsOps,
) -> usize {
    if torrent_dir.join(EXTRACTED_SENTINEL).exists() {
        return 0;
    }

    let files = match walk_files(torrent_dir).await {
        Ok(files) => files,
        Err(e) => {
            error!("Failed to scan {}: {}", torrent_dir.display(), e);
            return 0;
        }
    };

    let mut extracted = 0;
    for archive in files.iter().filter(|f| unpack::is_extractable_archive(f)) {
        if ops.is_dry_run() {
            info!("Would extract rar file: {}", archive.display());
            continue;
        }
        info!("Extracting rar file: {}", archive.display());
        match unpack::extract_archive(archive, extraction_root).await {
            Ok(()) => {
                info!("Extracted rar file: {}", archive.display());
                extracted += 1;
                if let Err(e) = ops
                    .write_sentinel(&torrent_dir.join(EXTRACTED_SENTINEL))
                    .await
                {
                    error!("{}", e);
                }
            }
            Err(e) => error!("{}", e),
        }
    }
    extracted
}

/// Walk the seeding and extraction roots, extracting archives along the
/// way, and return every non-sample video file found.
pub async fn discover(
    seeding_root: &Path,
    extraction_root: &Path,
    ops: &FsOps,
) -> Discovery {
    let mut discovery = Discovery::default();

    let mut entries = match fs::read_dir(seeding_root).await {
        Ok(entries) => entries,
        Err(e) => {
            error!("Failed to list {}: {}", seeding_root.display(), e);
            return discovery;
        }
    };

    let mut items = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        items.push(entry.path());
    }
    items.sort();

    for path in items {
        if path.is_dir() {
            discovery.extracted_archives +=
                extract_pending_archives(&path, extraction_root, ops).await;

            match walk_files(&path).await {
                Ok(files) => discovery
                    .video_files
                    .extend(files.into_iter().filter(|f| is_video_file(f))),
                Err(e) => error!("Failed to scan {}: {}", path.display(), e),
            }
        } else if is_video_file(&path) {
            discovery.video_files.push(path);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n != EXTRACTED_SENTINEL)
            .unwrap_or(true)
        {
            info!("Unrecognized item: {}", path.display());
        }
    }

    match walk_files(extraction_root).await {
        Ok(files) => discovery
            .video_files
            .extend(files.into_iter().filter(|f| is_video_file(f))),
        Err(e) => warn!("Failed to scan {}: {}", extraction_root.display(), e),
    }

    discovery.video_files.retain(|f| !is_sample(f));
    discovery
}

/// Names of the series folders that already exist in the library.
pub async fn list_series_dirs(destination: &Path) -> Vec<String> {
    let mut names = Vec::new();
    let mut entries = match fs::read_dir(destination).await {
        Ok(entries) => entries,
        Err(_) => return names,
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_sample() {
        assert!(is_sample(Path::new("/x/show/Sample/ep.mkv")));
        assert!(is_sample(Path::new("/x/show/show.sample.mkv")));
        assert!(is_sample(Path::new("/x/show/show-sample.mkv")));
        assert!(!is_sample(Path::new("/x/show/show.s01e01.mkv")));
    }

    #[tokio::test]
    async fn test_discover_finds_videos_and_skips_samples() {
        let temp = TempDir::new().unwrap();
        let seeding = temp.path().join("seeding");
        let extracted = temp.path().join("extracted");
        fs::create_dir_all(seeding.join("Show.S01E01.720p")).await.unwrap();
        fs::create_dir_all(&extracted).await.unwrap();

        fs::write(seeding.join("single.S01E02.mkv"), "a").await.unwrap();
        fs::write(seeding.join("Show.S01E01.720p/ep.mkv"), "b").await.unwrap();
        fs::write(seeding.join("Show.S01E01.720p/ep.sample.mkv"), "c")
            .await
            .unwrap();
        fs::write(seeding.join("Show.S01E01.720p/info.nfo"), "d").await.unwrap();
        fs::write(extracted.join("unpacked.S02E03.mkv"), "e").await.unwrap();

        let ops = FsOps::new(false);
        let discovery = discover(&seeding, &extracted, &ops).await;

        assert_eq!(discovery.video_files.len(), 3);
        assert!(discovery
            .video_files
            .contains(&seeding.join("single.S01E02.mkv")));
        assert!(discovery
            .video_files
            .contains(&seeding.join("Show.S01E01.720p/ep.mkv")));
        assert!(discovery
            .video_files
            .contains(&extracted.join("unpacked.S02E03.mkv")));
    }

    #[tokio::test]
    async fn test_discover_missing_roots() {
        let temp = TempDir::new().unwrap();
        let ops = FsOps::new(false);
        let discovery = discover(
            &temp.path().join("no-seeding"),
            &temp.path().join("no-extracted"),
            &ops,
        )
        .await;
        assert!(discovery.video_files.is_empty());
    }

    #[tokio::test]
    async fn test_sentinel_skips_extraction() {
        let temp = TempDir::new().unwrap();
        let torrent_dir = temp.path().join("Show.S01E01");
        fs::create_dir_all(&torrent_dir).await.unwrap();
        fs::write(torrent_dir.join("Show.S01E01.rar"), "rar").await.unwrap();
        fs::write(torrent_dir.join(EXTRACTED_SENTINEL), "").await.unwrap();

        let ops = FsOps::new(false);
        let extracted =
            extract_pending_archives(&torrent_dir, temp.path(), &ops).await;
        assert_eq!(extracted, 0);
    }

    #[tokio::test]
    async fn test_dry_run_skips_extraction_and_sentinel() {
        let temp = TempDir::new().unwrap();
        let torrent_dir = temp.path().join("Show.S01E01");
        fs::create_dir_all(&torrent_dir).await.unwrap();
        fs::write(torrent_dir.join("Show.S01E01.rar"), "rar").await.unwrap();

        let ops = FsOps::new(true);
        let extracted =
            extract_pending_archives(&torrent_dir, temp.path(), &ops).await;
        assert_eq!(extracted, 0);
        assert!(!torrent_dir.join(EXTRACTED_SENTINEL).exists());
    }

    #[tokio::test]
    async fn test_list_series_dirs() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("The Office")).await.unwrap();
        fs::create_dir_all(temp.path().join("Archer")).await.unwrap();
        fs::write(temp.path().join("stray.txt"), "x").await.unwrap();

        let dirs = list_series_dirs(temp.path()).await;
        assert_eq!(dirs, vec!["Archer".to_string(), "The Office".to_string()]);

        let missing = list_series_dirs(&temp.path().join("nope")).await;
        assert!(missing.is_empty());
    }
}
