//! Proper/repack supersession cleanup.
//!
//! A proper or repack release replaces an earlier defective release of the
//! same episode. When one lands in a library folder, the sibling files it
//! supersedes are deleted. Recency (file modification time) decides which
//! copy survives: a proper is by convention created after the files it
//! replaces, so the newest member of the group is kept.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tokio::fs;
use tracing::{debug, error, info};

use crate::fsops::{walk_files, FsOps};
use crate::metadata::{is_video_file, parse_release, EpisodeMeta};

/// A proper/repack tag immediately followed by a video extension.
static PROPER_VIDEO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(proper|repack)\..*\.(mkv|mp4|avi|ogm)$").unwrap());

/// Outcome of one supersession check.
#[derive(Debug, Default)]
pub struct SupersessionReport {
    /// Files deleted (or that would be deleted in dry-run).
    pub deleted: Vec<PathBuf>,
    /// Deletions that failed; failures never abort the group.
    pub failed: usize,
}

fn is_proper_release(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| PROPER_VIDEO_RE.is_match(n))
        .unwrap_or(false)
}

/// Whether `other` belongs to the supersession group of `proper`.
///
/// Title and episode must match. Season and resolution only have to match
/// when the proper itself carries them; a field the proper lacks is
/// compatible with anything.
fn in_group(proper: &EpisodeMeta, other: &EpisodeMeta) -> bool {
    if proper.title_key() != other.title_key() || other.title.is_none() {
        return false;
    }
    if proper.episode != other.episode || other.episode.is_none() {
        return false;
    }
    if proper.season.is_some() && proper.season != other.season {
        return false;
    }
    if proper.resolution.is_some() && proper.resolution != other.resolution {
        return false;
    }
    true
}

async fn modified_time(path: &Path) -> SystemTime {
    fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// If `file` is a proper/repack release, delete the sibling files it
/// supersedes, keeping the newest member of the group.
///
/// No-op when the file is not proper-tagged, no longer exists (an earlier
/// proper in the same batch may have removed it), or its name does not
/// yield a comparable title and episode.
pub async fn cleanup_if_proper(file: &Path, ops: &FsOps) -> SupersessionReport {
    let mut report = SupersessionReport::default();

    if !is_proper_release(file) {
        return report;
    }
    if !file.exists() {
        debug!("Proper/repack already gone: {}", file.display());
        return report;
    }

    let base_name = match file.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return report,
    };
    let meta = parse_release(base_name);
    if !meta.is_comparable() {
        debug!(
            "Series and episode undetermined, skipping proper/repack cleanup for {}",
            file.display()
        );
        return report;
    }

    let directory = match file.parent() {
        Some(dir) => dir,
        None => return report,
    };

    let mut group = vec![file.to_path_buf()];
    let mut entries = match fs::read_dir(directory).await {
        Ok(entries) => entries,
        Err(e) => {
            error!("Failed to list {}: {}", directory.display(), e);
            return report;
        }
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path == file || !is_video_file(&path) {
            continue;
        }
        match entry.file_type().await {
            Ok(ft) if ft.is_file() => {}
            _ => continue,
        }
        let sibling_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if in_group(&meta, &parse_release(&sibling_name)) {
            group.push(path);
        }
    }

    if group.len() < 2 {
        return report;
    }

    // Newest first; the head survives.
    let mut timed = Vec::with_capacity(group.len());
    for path in group {
        let mtime = modified_time(&path).await;
        timed.push((mtime, path));
    }
    timed.sort_by(|a, b| b.0.cmp(&a.0));

    info!(
        "Deleting files replaced by proper/repack, keeping: {}",
        timed[0].1.display()
    );
    for (_, path) in timed.into_iter().skip(1) {
        match ops.remove_file(&path).await {
            Ok(()) => {
                info!("Deleted superseded file: {}", path.display());
                report.deleted.push(path);
            }
            Err(e) => {
                error!("{}", e);
                report.failed += 1;
            }
        }
    }

    report
}

/// Maintenance mode: apply supersession cleanup across an entire library
/// tree rather than just newly placed files.
pub async fn proper_clean_tree(root: &Path, ops: &FsOps) -> SupersessionReport {
    let mut total = SupersessionReport::default();

    let files = match walk_files(root).await {
        Ok(files) => files,
        Err(e) => {
            error!("Failed to walk {}: {}", root.display(), e);
            return total;
        }
    };

    for file in files.into_iter().filter(|f| is_proper_release(f)) {
        let report = cleanup_if_proper(&file, ops).await;
        total.deleted.extend(report.deleted);
        total.failed += report.failed;
    }

    total
}
