//! Recursive folder size aggregation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::Serialize;

use burrow_core::{EngineConfig, EngineResult, Operation, ProgressReporter, ProgressSink};

use crate::progress::WalkTracker;
use crate::stat::stat_batched;
use crate::walker::{Flow, TreeWalker, WalkItem};

/// Number of extensions kept in the breakdown.
const TOP_FILE_TYPES: usize = 10;

/// Label for files without an extension.
const NO_EXTENSION: &str = "(none)";

/// Aggregate size of one extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTypeStat {
    pub extension: String,
    pub size: u64,
    pub count: u64,
}

/// Totals for a folder and everything beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSizeReport {
    pub path: PathBuf,
    pub total_size: u64,
    pub file_count: u64,
    pub folder_count: u64,
    /// Largest extensions by cumulative size.
    pub file_types: Vec<FileTypeStat>,
}

/// Compute the size of `root` and everything under it.
///
/// Nothing is excluded and depth is unbounded: the caller chose the subtree.
/// Files are stat'ed `folder_size_batch` at a time.
pub fn folder_size(
    root: &Path,
    config: &EngineConfig,
    op: &Operation,
    progress: &dyn ProgressSink,
) -> EngineResult<FolderSizeReport> {
    let batch_size = config.folder_size_batch;
    let mut reporter = ProgressReporter::new(progress, config.progress_interval());
    let mut tracker = WalkTracker::new();
    let mut by_extension: HashMap<String, (u64, u64)> = HashMap::new();

    let mut visit = |dir: &Path, children: &[WalkItem]| -> EngineResult<Flow> {
        tracker.set_current_path(dir);

        let files: Vec<WalkItem> = children
            .iter()
            .filter(|child| {
                if child.is_dir {
                    tracker.record_dir();
                }
                !child.is_dir
            })
            .cloned()
            .collect();

        for batch in files.chunks(batch_size.max(1)) {
            for entry in stat_batched(batch, batch_size, op)? {
                if entry.is_directory {
                    continue;
                }
                tracker.record_file(entry.size);
                let ext = entry
                    .extension()
                    .unwrap_or_else(|| NO_EXTENSION.to_string());
                let slot = by_extension.entry(ext).or_default();
                slot.0 += entry.size;
                slot.1 += 1;
            }
            reporter.report(|| tracker.snapshot());
        }

        Ok(Flow::Continue)
    };

    let stats = TreeWalker::new(op).walk(root, &mut visit)?;
    tracing::debug!(
        root = %root.display(),
        dirs = stats.dirs_read,
        skipped = stats.dirs_skipped,
        "folder size walk finished"
    );

    let file_types = by_extension
        .into_iter()
        .map(|(extension, (size, count))| FileTypeStat {
            extension,
            size,
            count,
        })
        .sorted_by(|a, b| b.size.cmp(&a.size).then_with(|| a.extension.cmp(&b.extension)))
        .take(TOP_FILE_TYPES)
        .collect();

    Ok(FolderSizeReport {
        path: root.to_path_buf(),
        total_size: tracker.calculated_size(),
        file_count: tracker.file_count(),
        folder_count: tracker.folder_count(),
        file_types,
    })
}
