//! Filesystem mutation layer.
//!
//! Every mutating filesystem action the tool performs goes through
//! `FsOps`. In dry-run mode each call logs the action it would have taken
//! and performs nothing, so a dry run produces the same narrative as a
//! real run with zero mutations.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::info;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum FsOpsError {
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Failed to copy {source_path} to {dest_path}: {source}")]
    CopyFailed {
        source_path: PathBuf,
        dest_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to move {source_path} to {dest_path}: {source}")]
    MoveFailed {
        source_path: PathBuf,
        dest_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to remove {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Dry-run-aware filesystem operations.
#[derive(Debug, Clone)]
pub struct FsOps {
    dry_run: bool,
}

impl FsOps {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Create `dir` and any missing parents.
    pub async fn create_dir_all(&self, dir: &Path) -> Result<(), FsOpsError> {
        if self.dry_run {
            info!("Would create directory: {}", dir.display());
            return Ok(());
        }
        fs::create_dir_all(dir)
            .await
            .map_err(|e| FsOpsError::DirectoryCreationFailed {
                path: dir.to_path_buf(),
                source: e,
            })
    }

    /// Copy `source` to `dest`, leaving the source in place.
    pub async fn copy_file(&self, source: &Path, dest: &Path) -> Result<u64, FsOpsError> {
        if self.dry_run {
            info!("Would copy: {} -> {}", source.display(), dest.display());
            return Ok(0);
        }
        copy_contents(source, dest).await
    }

    /// Move `source` to `dest`. Tries an atomic rename first and falls
    /// back to copy-then-remove across filesystems.
    pub async fn move_file(&self, source: &Path, dest: &Path) -> Result<(), FsOpsError> {
        if self.dry_run {
            info!("Would move: {} -> {}", source.display(), dest.display());
            return Ok(());
        }

        match fs::rename(source, dest).await {
            Ok(()) => Ok(()),
            // Cross-filesystem moves fail with EXDEV (18 on Linux).
            Err(e)
                if e.kind() == std::io::ErrorKind::CrossesDevices
                    || e.raw_os_error() == Some(18) =>
            {
                copy_contents(source, dest).await?;
                fs::remove_file(source)
                    .await
                    .map_err(|e| FsOpsError::MoveFailed {
                        source_path: source.to_path_buf(),
                        dest_path: dest.to_path_buf(),
                        source: e,
                    })
            }
            Err(e) => Err(FsOpsError::MoveFailed {
                source_path: source.to_path_buf(),
                dest_path: dest.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Delete a single file.
    pub async fn remove_file(&self, path: &Path) -> Result<(), FsOpsError> {
        if self.dry_run {
            info!("Would delete: {}", path.display());
            return Ok(());
        }
        fs::remove_file(path)
            .await
            .map_err(|e| FsOpsError::RemoveFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Delete a directory tree.
    pub async fn remove_dir_all(&self, path: &Path) -> Result<(), FsOpsError> {
        if self.dry_run {
            info!("Would delete directory tree: {}", path.display());
            return Ok(());
        }
        fs::remove_dir_all(path)
            .await
            .map_err(|e| FsOpsError::RemoveFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Create an empty marker file.
    pub async fn write_sentinel(&self, path: &Path) -> Result<(), FsOpsError> {
        if self.dry_run {
            info!("Would write sentinel: {}", path.display());
            return Ok(());
        }
        fs::write(path, b"")
            .await
            .map_err(|e| FsOpsError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }
}

/// Buffered copy, flushed before returning. Returns bytes written.
async fn copy_contents(source: &Path, dest: &Path) -> Result<u64, FsOpsError> {
    let source_file = File::open(source).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FsOpsError::SourceNotFound {
                path: source.to_path_buf(),
            }
        } else {
            FsOpsError::CopyFailed {
                source_path: source.to_path_buf(),
                dest_path: dest.to_path_buf(),
                source: e,
            }
        }
    })?;

    let dest_file = File::create(dest).await.map_err(|e| FsOpsError::CopyFailed {
        source_path: source.to_path_buf(),
        dest_path: dest.to_path_buf(),
        source: e,
    })?;

    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, source_file);
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, dest_file);
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer).await.map_err(|e| {
            FsOpsError::CopyFailed {
                source_path: source.to_path_buf(),
                dest_path: dest.to_path_buf(),
                source: e,
            }
        })?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read]).await.map_err(|e| {
            FsOpsError::CopyFailed {
                source_path: source.to_path_buf(),
                dest_path: dest.to_path_buf(),
                source: e,
            }
        })?;
        total_bytes += bytes_read as u64;
    }

    writer.flush().await.map_err(|e| FsOpsError::CopyFailed {
        source_path: source.to_path_buf(),
        dest_path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(total_bytes)
}

/// Size of a file, or `None` when it does not exist or is unreadable.
pub async fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).await.ok().map(|m| m.len())
}

/// Recursively list all regular files under `root`.
/// A missing root yields an empty list.
pub async fn walk_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !root.exists() {
        return Ok(files);
    }

    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
