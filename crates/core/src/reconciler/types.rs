//! Types for the lifecycle reconciler.

use std::path::PathBuf;
use thiserror::Error;

use crate::fsops::FsOpsError;
use crate::ledger::LedgerError;

/// Where a file should land in the library, derived per file from parsed
/// metadata, the resolved series and any override rules. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementDecision {
    /// Library folder name chosen for the series.
    pub series: String,
    /// Season folder component, when the release carries a season.
    pub season: Option<u32>,
    /// Directory the file belongs in.
    pub target_dir: PathBuf,
    /// Full target path (target_dir + source base name).
    pub target_file: PathBuf,
    /// Human description handed to the moved-event hook.
    pub description: String,
}

/// What the reconciler did with one discovered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    /// Still seeding, first sighting: copied into the library, ledgered.
    Copied,
    /// Still seeding but already ledgered: left alone.
    AlreadyCopied,
    /// No longer seeding and ledgered: source deleted, ledger entry kept
    /// for the garbage collector to prune.
    DeletedAfterCopy,
    /// Target exists and is not smaller: nothing touched.
    ConflictSkipped,
    /// Not seeding, not ledgered: moved into the library.
    Moved,
}

/// Per-file failures. One bad file never stops the run; the orchestrating
/// loop logs these and moves on.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Unable to parse series name from: {0}")]
    UnparsedTitle(PathBuf),

    #[error("Source file disappeared: {0}")]
    SourceVanished(PathBuf),

    #[error(transparent)]
    Fs(#[from] FsOpsError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Counters for one reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileStats {
    pub discovered: usize,
    pub extracted_archives: usize,
    pub copied: usize,
    pub moved: usize,
    pub deleted: usize,
    pub already_copied: usize,
    pub conflicts: usize,
    pub failed: usize,
}

impl ReconcileStats {
    pub fn record(&mut self, action: FileAction) {
        match action {
            FileAction::Copied => self.copied += 1,
            FileAction::AlreadyCopied => self.already_copied += 1,
            FileAction::DeletedAfterCopy => self.deleted += 1,
            FileAction::ConflictSkipped => self.conflicts += 1,
            FileAction::Moved => self.moved += 1,
        }
    }
}
