//! Batched metadata lookups.

use std::fs;

use rayon::prelude::*;

use burrow_core::{EngineResult, Entry, Operation};

use crate::walker::WalkItem;

/// Stat a slice of walk items, `batch_size` at a time.
///
/// Each batch is resolved in parallel on the rayon pool, which bounds the
/// number of concurrent stat calls. An item whose metadata cannot be read
/// becomes a placeholder entry (size 0, epoch timestamp). Cancellation is
/// checked before every batch. Output order matches input order.
pub fn stat_batched(
    items: &[WalkItem],
    batch_size: usize,
    op: &Operation,
) -> EngineResult<Vec<Entry>> {
    let mut entries = Vec::with_capacity(items.len());
    for batch in items.chunks(batch_size.max(1)) {
        op.check()?;
        entries.extend(stat_batch(batch));
    }
    Ok(entries)
}

/// Stat one batch in parallel.
pub fn stat_batch(batch: &[WalkItem]) -> Vec<Entry> {
    batch.par_iter().map(stat_item).collect()
}

/// Stat a single item, falling back to a placeholder on failure.
pub fn stat_item(item: &WalkItem) -> Entry {
    match fs::metadata(&item.path) {
        Ok(metadata) => Entry::from_metadata(&item.path, &metadata),
        Err(err) => {
            tracing::debug!(path = %item.path.display(), %err, "stat failed");
            Entry::without_metadata(&item.path, item.is_dir)
        }
    }
}
