//! Lifecycle reconciler.
//!
//! For each discovered video file, combines seeding-set membership,
//! ledger membership and target existence/size into exactly one action:
//!
//! | seeding | ledgered | target vs source      | action                 |
//! |---------|----------|-----------------------|------------------------|
//! | yes     | no       | (no conflict)         | copy, ledger, events   |
//! | yes     | yes      | -                     | leave alone            |
//! | no      | yes      | -                     | delete source          |
//! | -       | -        | target >= source size | skip, log conflict     |
//! | no      | no       | target missing/smaller| move, events           |
//!
//! The conflict row is checked first: a target that is not smaller than
//! the source is never overwritten, whatever the other facts say.

mod discover;
mod types;

pub use discover::{discover, list_series_dirs, Discovery};
pub use types::{FileAction, PlacementDecision, ReconcileError, ReconcileStats};

use std::path::{Path, PathBuf};

use regex_lite::{Regex, RegexBuilder};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::events;
use crate::fsops::{file_size, FsOps};
use crate::ledger::CopiedLedger;
use crate::metadata::{parse_release, EpisodeMeta};
use crate::resolver::resolve_series;
use crate::supersede;
use crate::torrent_client::SeedingSnapshot;

/// An override rule with its pattern compiled once per run.
struct CompiledOverride {
    pattern: Regex,
    series: Option<String>,
    destination: Option<PathBuf>,
}

/// Drives one reconciliation pass over the discovered files.
pub struct Reconciler<'a> {
    config: &'a Config,
    snapshot: &'a SeedingSnapshot,
    ledger: &'a dyn CopiedLedger,
    ops: &'a FsOps,
    overrides: Vec<CompiledOverride>,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        config: &'a Config,
        snapshot: &'a SeedingSnapshot,
        ledger: &'a dyn CopiedLedger,
        ops: &'a FsOps,
    ) -> Self {
        // Patterns match case-insensitively against base names. Validation
        // already rejects patterns that do not compile.
        let overrides = config
            .overrides
            .iter()
            .filter_map(|rule| {
                match RegexBuilder::new(&rule.pattern).case_insensitive(true).build() {
                    Ok(pattern) => Some(CompiledOverride {
                        pattern,
                        series: rule.series.clone(),
                        destination: rule.destination.clone(),
                    }),
                    Err(e) => {
                        warn!("Skipping invalid override pattern {}: {}", rule.pattern, e);
                        None
                    }
                }
            })
            .collect();

        Self {
            config,
            snapshot,
            ledger,
            ops,
            overrides,
        }
    }

    /// Run discovery, the archive pre-step and per-file classification.
    /// Per-file failures are logged and never stop the pass.
    pub async fn run(&self) -> ReconcileStats {
        let dirs = &self.config.directories;
        let discovery = discover(&dirs.seeding, &dirs.extracted, self.ops).await;
        let existing_series = list_series_dirs(&dirs.destination).await;

        let mut stats = ReconcileStats {
            discovered: discovery.video_files.len(),
            extracted_archives: discovery.extracted_archives,
            ..ReconcileStats::default()
        };

        for file in &discovery.video_files {
            match self.process_file(file, &existing_series).await {
                Ok(action) => stats.record(action),
                Err(ReconcileError::UnparsedTitle(path)) => {
                    warn!("Unable to parse series name from: {}", path.display());
                    stats.failed += 1;
                }
                Err(e) => {
                    error!("Failed to process {}: {}", file.display(), e);
                    stats.failed += 1;
                }
            }
        }

        stats
    }

    /// Derive where `source` belongs: resolve the series against existing
    /// folders, then let override rules replace the series and/or the
    /// destination root (first matching rule wins per field).
    pub fn decide_placement(
        &self,
        source: &Path,
        meta: &EpisodeMeta,
        existing_series: &[String],
    ) -> Option<PlacementDecision> {
        let base_name = source.file_name()?.to_str()?;
        let title = meta.title.as_deref()?;

        let mut series = resolve_series(title, existing_series);
        let mut destination = self.config.directories.destination.clone();

        let mut series_overridden = false;
        let mut destination_overridden = false;
        for rule in &self.overrides {
            if !rule.pattern.is_match(base_name) {
                continue;
            }
            if !series_overridden {
                if let Some(s) = &rule.series {
                    debug!("Overriding series name to: {}", s);
                    series = s.clone();
                    series_overridden = true;
                }
            }
            if !destination_overridden {
                if let Some(d) = &rule.destination {
                    debug!("Overriding destination folder to: {}", d.display());
                    destination = d.clone();
                    destination_overridden = true;
                }
            }
        }

        let episode_desc = match meta.episode {
            Some(n) => format!("Episode {}", n),
            None => "Special".to_string(),
        };

        let (target_dir, description) = match meta.season {
            Some(season) => (
                destination.join(&series).join(format!("Season {}", season)),
                format!("{} - Season {} - {}", series, season, episode_desc),
            ),
            None => (
                destination.join(&series),
                format!("{} - {}", series, episode_desc),
            ),
        };

        Some(PlacementDecision {
            series,
            season: meta.season,
            target_file: target_dir.join(base_name),
            target_dir,
            description,
        })
    }

    async fn process_file(
        &self,
        source: &Path,
        existing_series: &[String],
    ) -> Result<FileAction, ReconcileError> {
        let base_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ReconcileError::UnparsedTitle(source.to_path_buf()))?;
        let meta = parse_release(base_name);
        let placement = self
            .decide_placement(source, &meta, existing_series)
            .ok_or_else(|| ReconcileError::UnparsedTitle(source.to_path_buf()))?;

        let source_size = file_size(source)
            .await
            .ok_or_else(|| ReconcileError::SourceVanished(source.to_path_buf()))?;

        // No-clobber: an equal-or-larger target blocks every action on
        // this file. Expected contention with a still-downloading copy.
        let target_size = file_size(&placement.target_file).await;
        if let Some(target_size) = target_size {
            if target_size >= source_size {
                info!(
                    "Target exists and is not smaller, skipping: {}",
                    placement.target_file.display()
                );
                return Ok(FileAction::ConflictSkipped);
            }
        }

        let seeding = self.snapshot.is_seeding(source);
        let ledgered = self.ledger.contains(source)?;

        match (seeding, ledgered) {
            (true, false) => {
                info!(
                    "Copying and scheduling original for delete: {} to {}",
                    source.display(),
                    placement.target_dir.display()
                );
                self.ops.create_dir_all(&placement.target_dir).await?;
                self.ops.copy_file(source, &placement.target_file).await?;
                // Ledger write only after the copy succeeded: a crash in
                // between re-copies next run, which the size check above
                // makes harmless.
                if !self.ops.is_dry_run() {
                    self.ledger.add(source)?;
                }
                self.after_placement(&placement).await;
                Ok(FileAction::Copied)
            }
            (true, true) => {
                debug!(
                    "Ignoring file {}, it has already been copied",
                    source.display()
                );
                Ok(FileAction::AlreadyCopied)
            }
            (false, true) => {
                info!("Deleting already copied file: {}", source.display());
                self.ops.remove_file(source).await?;
                // Ledger entry is pruned later by the garbage collector.
                Ok(FileAction::DeletedAfterCopy)
            }
            (false, false) => {
                info!(
                    "Moving {} to {}",
                    source.display(),
                    placement.target_dir.display()
                );
                self.ops.create_dir_all(&placement.target_dir).await?;
                // Any pre-existing target is strictly smaller here.
                if target_size.is_some() {
                    self.ops.remove_file(&placement.target_file).await?;
                }
                self.ops.move_file(source, &placement.target_file).await?;
                self.after_placement(&placement).await;
                Ok(FileAction::Moved)
            }
        }
    }

    /// Post-placement steps: moved-event hook, then supersession cleanup
    /// on the placed file.
    async fn after_placement(&self, placement: &PlacementDecision) {
        if let Some(program) = &self.config.events.moved {
            if self.ops.is_dry_run() {
                info!(
                    "Would run move event: {} {} {}",
                    program.display(),
                    placement.target_file.display(),
                    placement.description
                );
            } else {
                events::fire_moved_event(program, &placement.target_file, &placement.description)
                    .await;
            }
        }

        let report = supersede::cleanup_if_proper(&placement.target_file, self.ops).await;
        if !report.deleted.is_empty() || report.failed > 0 {
            info!(
                "Supersession cleanup around {}: {} deleted, {} failed",
                placement.target_file.display(),
                report.deleted.len(),
                report.failed
            );
        }
    }
}
