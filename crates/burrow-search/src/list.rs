//! Content search over a caller-supplied file list.

use burrow_core::{EngineResult, Entry, Operation};

use crate::live::{check_limits, match_content};
use crate::matcher::Query;
use crate::options::SearchOptions;

/// Run the per-file content check over `files`, in order.
///
/// The entries' own size and date fields feed the filters; only candidates
/// that pass are opened.
pub fn search_content_list(
    files: &[Entry],
    query: &Query,
    options: &SearchOptions,
    op: &Operation,
) -> EngineResult<Vec<Entry>> {
    check_limits(options)?;

    let mut results = Vec::new();
    for entry in files {
        op.check()?;
        if let Some(hit) = match_content(entry, query, options, op)? {
            results.push(hit);
            if results.len() >= options.max_results {
                break;
            }
        }
    }
    Ok(results)
}
