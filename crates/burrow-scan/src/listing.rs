//! Batched single-directory listing.

use std::path::{Path, PathBuf};

use serde::Serialize;

use burrow_core::{EngineResult, Entry, Operation, ProgressData, ProgressSink};

use crate::hidden::HiddenResolver;
use crate::stat::stat_batch;
use crate::walker::{ensure_directory, read_children};

/// Contents of one directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub path: PathBuf,
    pub contents: Vec<Entry>,
}

/// List `dir`, `batch_size` entries at a time.
///
/// Each batch is stat'ed and, unless `include_hidden` is set, run through
/// the hidden resolver; hidden entries are dropped. With `include_hidden`
/// no hidden resolution happens at all. A `loaded` progress event follows
/// every batch.
pub fn list_directory(
    dir: &Path,
    batch_size: usize,
    include_hidden: bool,
    resolver: &HiddenResolver,
    op: &Operation,
    progress: &dyn ProgressSink,
) -> EngineResult<DirectoryListing> {
    ensure_directory(dir)?;
    let children = read_children(dir, 0, op)?;

    let mut contents = Vec::with_capacity(children.len());
    let mut loaded = 0u64;
    for batch in children.chunks(batch_size.max(1)) {
        op.check()?;
        let entries = stat_batch(batch);
        loaded += entries.len() as u64;

        if include_hidden {
            contents.extend(entries);
        } else {
            let paths: Vec<PathBuf> = entries.iter().map(|e| e.path.clone()).collect();
            let hidden = resolver.resolve_many(&paths);
            contents.extend(
                entries
                    .into_iter()
                    .zip(hidden)
                    .filter_map(|(entry, hidden)| (!hidden).then_some(entry)),
            );
        }

        progress.send(ProgressData::Listing { loaded });
    }

    Ok(DirectoryListing {
        path: dir.to_path_buf(),
        contents,
    })
}
