//! Single-instance lock.
//!
//! Only one seedshelf run may execute against a given ledger and library
//! tree at a time. A run that finds the lock held by a live process exits
//! silently; that is an expected overlap with a slow previous run, not an
//! error. A lock left behind by a dead process is taken over.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Failed to access lock file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Held for the duration of a run; the lock file is removed on drop,
/// including on abnormal exit paths that still unwind.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Try to acquire the lock at `path`.
    ///
    /// Returns `Ok(None)` when another live instance holds it.
    pub fn acquire(path: &Path) -> Result<Option<Self>, LockError> {
        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    let pid = std::process::id();
                    file.write_all(pid.to_string().as_bytes())
                        .map_err(|e| LockError::Io {
                            path: path.to_path_buf(),
                            source: e,
                        })?;
                    debug!("Acquired instance lock at {} (pid {})", path.display(), pid);
                    return Ok(Some(Self {
                        path: path.to_path_buf(),
                    }));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    let holder = std::fs::read_to_string(path)
                        .ok()
                        .and_then(|s| s.trim().parse::<u32>().ok());
                    match holder {
                        Some(pid) if process_alive(pid) => {
                            debug!(
                                "Instance lock {} held by live pid {}",
                                path.display(),
                                pid
                            );
                            return Ok(None);
                        }
                        _ => {
                            // Stale lock from a crashed run; take it over.
                            warn!("Removing stale instance lock at {}", path.display());
                            if let Err(e) = std::fs::remove_file(path) {
                                if e.kind() != std::io::ErrorKind::NotFound {
                                    return Err(LockError::Io {
                                        path: path.to_path_buf(),
                                        source: e,
                                    });
                                }
                            }
                            // Loop once more to race for the fresh file.
                        }
                    }
                }
                Err(e) => {
                    return Err(LockError::Io {
                        path: path.to_path_buf(),
                        source: e,
                    })
                }
            }
        }
        Ok(None)
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    // Without a portable liveness probe, assume the holder is alive and
    // let the operator clear the lock manually.
    true
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove instance lock {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("seedshelf.lock");

        let lock = InstanceLock::acquire(&path).unwrap();
        assert!(lock.is_some());
        assert!(path.exists());

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_second_acquire_by_live_holder_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("seedshelf.lock");

        // First acquisition records this (live) process's pid.
        let _lock = InstanceLock::acquire(&path).unwrap().unwrap();
        let second = InstanceLock::acquire(&path).unwrap();
        assert!(second.is_none());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_stale_lock_is_taken_over() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("seedshelf.lock");

        // A pid far above the default pid_max cannot be alive.
        std::fs::write(&path, "4194304999").unwrap();

        let lock = InstanceLock::acquire(&path).unwrap();
        assert!(lock.is_some());
    }

    #[test]
    fn test_unparseable_lock_is_taken_over() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("seedshelf.lock");
        std::fs::write(&path, "not a pid").unwrap();

        let lock = InstanceLock::acquire(&path).unwrap();
        assert!(lock.is_some());
    }

    #[test]
    fn test_reacquire_after_release() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("seedshelf.lock");

        drop(InstanceLock::acquire(&path).unwrap());
        let again = InstanceLock::acquire(&path).unwrap();
        assert!(again.is_some());
    }
}
