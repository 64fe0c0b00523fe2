//! Durable record of source files already copied into the library.
//!
//! A ledger entry means "this source file was copied to the library and
//! the original may be deleted once the torrent client drops it". Entries
//! are written only after the copy succeeds and removed by the garbage
//! collector once the source leaves the seeding set.

mod sqlite;

pub use sqlite::SqliteLedger;

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger database error: {0}")]
    Database(String),
}

/// A durable key set of already-copied source paths.
///
/// Every mutation must be immediately durable: a crash mid-run has to
/// leave the ledger consistent with completed filesystem operations.
pub trait CopiedLedger: Send + Sync {
    /// Record that `path` has been copied into the library.
    fn add(&self, path: &Path) -> Result<(), LedgerError>;

    /// Forget about `path`.
    fn remove(&self, path: &Path) -> Result<(), LedgerError>;

    /// Whether `path` has been recorded as copied.
    fn contains(&self, path: &Path) -> Result<bool, LedgerError>;

    /// Every recorded path.
    fn all(&self) -> Result<Vec<PathBuf>, LedgerError>;
}
