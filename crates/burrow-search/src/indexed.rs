//! Searches over the persisted index.

use std::path::Path;

use burrow_core::{EngineResult, Entry, Operation};

use crate::list::search_content_list;
use crate::live::check_limits;
use crate::matcher::{Query, rank_by_name};
use crate::options::SearchOptions;
use crate::store::IndexStore;

/// Name search over the index at `index_path`.
///
/// The filesystem is not touched beyond reading the index. Results are
/// ranked like a live name search.
pub fn search_index(
    index_path: &Path,
    query: &Query,
    options: &SearchOptions,
    op: &Operation,
) -> EngineResult<Vec<Entry>> {
    check_limits(options)?;
    let index = IndexStore::new(index_path).load_for_search()?;

    let mut results = Vec::new();
    for entry in index.entries {
        op.check()?;
        if query.matches_name(&entry.name) && options.filters.accepts(&entry) {
            results.push(entry);
            if results.len() >= options.max_results {
                break;
            }
        }
    }

    rank_by_name(&mut results, query);
    Ok(results)
}

/// Content search over the files listed in the index at `index_path`.
///
/// Only candidates passing the filters and the text allow-list are opened.
pub fn search_content_index(
    index_path: &Path,
    query: &Query,
    options: &SearchOptions,
    op: &Operation,
) -> EngineResult<Vec<Entry>> {
    check_limits(options)?;
    let index = IndexStore::new(index_path).load_for_search()?;
    search_content_list(&index.entries, query, options, op)
}
