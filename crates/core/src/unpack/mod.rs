//! Multi-part archive extraction.
//!
//! Torrents sometimes ship episodes inside rar archives. The first part
//! of each archive set gets extracted once into the extraction root; a
//! sentinel file in the torrent directory records that extraction already
//! happened so later runs skip it.

use std::path::Path;
use std::process::Stdio;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use thiserror::Error;
use tokio::process::Command;

/// Marker file written into a torrent directory after its archives have
/// been extracted.
pub const EXTRACTED_SENTINEL: &str = ".autoextracted";

static RAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i).*\.rar$").unwrap());

/// Parts 2 and up of a multi-part set; only the first part is fed to
/// unrar, which follows the rest itself.
static PARTIAL_SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i).*part(\d*[2-9])\.rar$").unwrap());

static SUBS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.subs\.").unwrap());

static SAMPLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.sample\.").unwrap());

#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("Failed to run unrar on {path}: {source}")]
    Spawn {
        path: String,
        source: std::io::Error,
    },

    #[error("unrar failed on {path} ({status}):\n{output}")]
    CommandFailed {
        path: String,
        status: String,
        output: String,
    },
}

/// Whether this file is an archive worth extracting: a first-part rar
/// that is neither a subtitle pack nor a sample.
pub fn is_extractable_archive(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    RAR_RE.is_match(name)
        && !PARTIAL_SEGMENT_RE.is_match(name)
        && !SUBS_RE.is_match(name)
        && !SAMPLE_RE.is_match(name)
}

/// Extract `archive` into `dest`. Existing files are never overwritten
/// (`-o-`); a hang in unrar stalls the run, matching the synchronous
/// external-call model.
pub async fn extract_archive(archive: &Path, dest: &Path) -> Result<(), UnpackError> {
    let output = Command::new("unrar")
        .arg("x")
        .arg("-o-")
        .arg("-y")
        .arg("-idq")
        .arg(archive)
        .arg(dest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| UnpackError::Spawn {
            path: archive.display().to_string(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(UnpackError::CommandFailed {
            path: archive.display().to_string(),
            status: output.status.to_string(),
            output: format!(
                "{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_part_is_extractable() {
        assert!(is_extractable_archive(Path::new("/x/show.s01e01.rar")));
        assert!(is_extractable_archive(Path::new("/x/show.part1.rar")));
        assert!(is_extractable_archive(Path::new("/x/show.part01.rar")));
    }

    #[test]
    fn test_later_parts_are_skipped() {
        assert!(!is_extractable_archive(Path::new("/x/show.part2.rar")));
        assert!(!is_extractable_archive(Path::new("/x/show.part02.rar")));
        assert!(!is_extractable_archive(Path::new("/x/show.part19.rar")));
    }

    #[test]
    fn test_subs_and_samples_are_skipped() {
        assert!(!is_extractable_archive(Path::new("/x/show.subs.rar")));
        assert!(!is_extractable_archive(Path::new("/x/show.SUBS.rar")));
        assert!(!is_extractable_archive(Path::new("/x/show.Sample.rar")));
    }

    #[test]
    fn test_non_rar_is_skipped() {
        assert!(!is_extractable_archive(Path::new("/x/show.mkv")));
        assert!(!is_extractable_archive(Path::new("/x/show.zip")));
    }
}
