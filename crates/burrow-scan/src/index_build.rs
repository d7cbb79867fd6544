//! Flat index construction over one or more locations.

use std::path::{Path, PathBuf};

use serde::Serialize;

use burrow_core::{
    EngineConfig, EngineError, EngineResult, Entry, ExclusionPolicy, Operation, ProgressReporter,
    ProgressSink,
};

use crate::progress::WalkTracker;
use crate::stat::stat_batched;
use crate::walker::{Flow, TreeWalker, WalkItem};

/// Outcome of an index build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexBuildReport {
    /// Indexed files, in walk order.
    pub entries: Vec<Entry>,
    /// Number of entries (same as `entries.len()`).
    pub entry_count: usize,
    /// Whether the entry cap cut the build short.
    pub truncated: bool,
    /// Locations that were skipped (missing, not a directory, or nested
    /// inside another location).
    pub skipped_locations: Vec<PathBuf>,
}

/// Walks locations and collects every non-excluded file.
///
/// Depth is unbounded; the only limit is the entry cap. Hidden flags are
/// not resolved.
pub struct IndexBuilder<'a> {
    policy: &'a ExclusionPolicy,
    batch_size: usize,
    config: &'a EngineConfig,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(config: &'a EngineConfig, policy: &'a ExclusionPolicy) -> Self {
        Self {
            policy,
            batch_size: config.folder_size_batch,
            config,
        }
    }

    /// Build the index, stopping once `max_entries` files are collected.
    pub fn build(
        &self,
        locations: &[PathBuf],
        max_entries: usize,
        op: &Operation,
        progress: &dyn ProgressSink,
    ) -> EngineResult<IndexBuildReport> {
        if locations.is_empty() {
            return Err(EngineError::invalid("no locations to index"));
        }
        if max_entries == 0 {
            return Err(EngineError::invalid("maxIndexSize must be positive"));
        }

        let (roots, mut skipped_locations) = distinct_roots(locations);
        let mut reporter = ProgressReporter::new(progress, self.config.progress_interval());
        let mut tracker = WalkTracker::new();
        let mut entries = Vec::new();
        let mut truncated = false;

        for root in roots {
            let remaining = max_entries - entries.len();
            let mut collected = Vec::new();
            let mut pending: Vec<WalkItem> = Vec::new();

            let mut visit = |dir: &Path, children: &[WalkItem]| -> EngineResult<Flow> {
                tracker.set_current_path(dir);
                for child in children {
                    if child.is_dir {
                        tracker.record_dir();
                    } else {
                        pending.push(child.clone());
                    }
                }
                if pending.len() >= self.batch_size {
                    self.flush(&mut pending, &mut collected, &mut tracker, op)?;
                    reporter.report(|| tracker.snapshot());
                }
                // one file past the cap proves the index is truncated
                Ok(if collected.len() > remaining {
                    Flow::Stop
                } else {
                    Flow::Continue
                })
            };

            let walked = TreeWalker::new(op)
                .with_exclusion(self.policy)
                .walk(&root, &mut visit);

            match walked {
                Ok(stats) => {
                    tracing::debug!(
                        root = %root.display(),
                        dirs = stats.dirs_read,
                        skipped = stats.dirs_skipped,
                        "indexed location"
                    );
                }
                Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
                Err(err) => {
                    tracing::warn!(root = %root.display(), %err, "skipping index location");
                    skipped_locations.push(root);
                    continue;
                }
            }

            self.flush(&mut pending, &mut collected, &mut tracker, op)?;
            if collected.len() > remaining {
                collected.truncate(remaining);
                truncated = true;
            }
            entries.extend(collected);
            if truncated {
                break;
            }
        }

        tracing::info!(entries = entries.len(), truncated, "index build finished");
        Ok(IndexBuildReport {
            entry_count: entries.len(),
            entries,
            truncated,
            skipped_locations,
        })
    }

    fn flush(
        &self,
        pending: &mut Vec<WalkItem>,
        collected: &mut Vec<Entry>,
        tracker: &mut WalkTracker,
        op: &Operation,
    ) -> EngineResult<()> {
        if pending.is_empty() {
            return Ok(());
        }
        let stated = stat_batched(pending, self.batch_size, op)?;
        pending.clear();

        // symlinks to directories are reported as files by the listing
        for entry in stated.into_iter().filter(|e| !e.is_directory) {
            tracker.record_file(entry.size);
            collected.push(entry);
        }
        Ok(())
    }
}

/// Drop duplicate and nested locations, keeping the outermost.
fn distinct_roots(locations: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut sorted: Vec<PathBuf> = locations.to_vec();
    sorted.sort();

    let mut roots: Vec<PathBuf> = Vec::new();
    let mut skipped = Vec::new();
    for location in sorted {
        if roots.iter().any(|root| location.starts_with(root)) {
            tracing::debug!(location = %location.display(), "location nested in another, skipping");
            skipped.push(location);
        } else {
            roots.push(location);
        }
    }
    (roots, skipped)
}
