//! Searches that walk a live directory tree.

use std::path::{Path, PathBuf};

use burrow_core::{EngineError, EngineResult, Entry, ExclusionPolicy, Operation};
use burrow_scan::{Flow, HiddenResolver, TreeWalker, WalkItem, stat_item};

use crate::matcher::{Query, find_in_file, is_text_file, rank_by_name};
use crate::options::SearchOptions;

/// Find entries under `root` whose names contain the query.
///
/// Hidden flags are resolved for the matches only, in one batch. Results are
/// ranked exact-match first, then by name.
pub fn search_files(
    root: &Path,
    query: &Query,
    options: &SearchOptions,
    policy: &ExclusionPolicy,
    resolver: &HiddenResolver,
    op: &Operation,
) -> EngineResult<Vec<Entry>> {
    check_limits(options)?;
    let filters = &options.filters;
    let mut results: Vec<Entry> = Vec::new();

    let mut visit = |_: &Path, children: &[WalkItem]| -> EngineResult<Flow> {
        for child in children {
            if !query.matches_name(&child.name) || !filters.accepts_kind(&child.name, child.is_dir) {
                continue;
            }
            let entry = stat_item(child);
            if !filters.accepts_metadata(entry.size, entry.modified, entry.is_directory) {
                continue;
            }
            results.push(entry);
            if results.len() >= options.max_results {
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    };

    TreeWalker::new(op)
        .with_exclusion(policy)
        .with_max_depth(options.max_depth)
        .walk(root, &mut visit)?;

    let paths: Vec<PathBuf> = results.iter().map(|e| e.path.clone()).collect();
    let hidden = resolver.resolve_many(&paths);
    let mut results: Vec<Entry> = results
        .into_iter()
        .zip(hidden)
        .map(|(entry, hidden)| entry.with_hidden(hidden))
        .collect();

    rank_by_name(&mut results, query);
    tracing::debug!(root = %root.display(), matches = results.len(), "name search finished");
    Ok(results)
}

/// Find text files under `root` containing the query, one hit per file.
///
/// Size and date filters run before a file is opened. Results keep walk
/// order.
pub fn search_content(
    root: &Path,
    query: &Query,
    options: &SearchOptions,
    policy: &ExclusionPolicy,
    op: &Operation,
) -> EngineResult<Vec<Entry>> {
    check_limits(options)?;
    let mut results: Vec<Entry> = Vec::new();

    let mut visit = |_: &Path, children: &[WalkItem]| -> EngineResult<Flow> {
        for child in children {
            if child.is_dir
                || !is_text_file(&child.name)
                || !options.filters.accepts_kind(&child.name, false)
            {
                continue;
            }
            let entry = stat_item(child);
            if let Some(hit) = match_content(&entry, query, options, op)? {
                results.push(hit);
                if results.len() >= options.max_results {
                    return Ok(Flow::Stop);
                }
            }
        }
        Ok(Flow::Continue)
    };

    TreeWalker::new(op)
        .with_exclusion(policy)
        .with_max_depth(options.max_depth)
        .walk(root, &mut visit)?;

    tracing::debug!(root = %root.display(), matches = results.len(), "content search finished");
    Ok(results)
}

/// Run the per-file content check on one candidate entry.
///
/// Directories, files outside the text allow-list, oversized files and
/// entries rejected by the filters are skipped without being opened.
pub fn match_content(
    entry: &Entry,
    query: &Query,
    options: &SearchOptions,
    op: &Operation,
) -> EngineResult<Option<Entry>> {
    if entry.is_directory
        || !is_text_file(&entry.name)
        || entry.size > options.max_file_size
        || !options.filters.accepts(entry)
    {
        return Ok(None);
    }

    let hit = find_in_file(&entry.path, query, options.context_chars, op)?;
    Ok(hit.map(|hit| entry.clone().with_match(hit.context, hit.line_number)))
}

pub(crate) fn check_limits(options: &SearchOptions) -> EngineResult<()> {
    if options.max_results == 0 {
        return Err(EngineError::invalid("maxResults must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use burrow_core::{EngineConfig, FileTypeClass, SearchFilters};

    fn fixture() -> tempfile::TempDir {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("docs/old")).unwrap();
        fs::create_dir(root.join("node_modules")).unwrap();
        fs::write(root.join("budget.csv"), "item,cost\nrent,100\n").unwrap();
        fs::write(root.join("docs/Budget notes.md"), "# Notes\nthe BUDGET is tight\n").unwrap();
        fs::write(root.join("docs/old/budget.csv"), "archived\n").unwrap();
        fs::write(root.join("node_modules/budget.js"), "budget()\n").unwrap();
        fs::write(root.join("photo.jpg"), "budget in exif\n").unwrap();
        temp
    }

    #[test]
    fn test_name_search_ranks_exact_first() {
        let temp = fixture();
        let resolver = HiddenResolver::for_platform(&EngineConfig::default());

        let results = search_files(
            temp.path(),
            &Query::new("budget.csv").unwrap(),
            &SearchOptions::default(),
            &ExclusionPolicy::new(),
            &resolver,
            &Operation::detached(),
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|e| e.name == "budget.csv"));
    }

    #[test]
    fn test_name_search_respects_depth_and_exclusion() {
        let temp = fixture();
        let resolver = HiddenResolver::for_platform(&EngineConfig::default());
        let options = SearchOptions::builder().max_depth(1usize).build().unwrap();

        let results = search_files(
            temp.path(),
            &Query::new("budget").unwrap(),
            &options,
            &ExclusionPolicy::new(),
            &resolver,
            &Operation::detached(),
        )
        .unwrap();

        let names: Vec<_> = results.iter().map(|e| e.name.as_str()).collect();
        // ' ' sorts before '.'
        assert_eq!(names, vec!["Budget notes.md", "budget.csv"]);
    }

    #[test]
    fn test_name_search_stops_at_cap() {
        let temp = fixture();
        let resolver = HiddenResolver::for_platform(&EngineConfig::default());
        let options = SearchOptions::builder().max_results(1usize).build().unwrap();

        let results = search_files(
            temp.path(),
            &Query::new("budget").unwrap(),
            &options,
            &ExclusionPolicy::new(),
            &resolver,
            &Operation::detached(),
        )
        .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_content_search_skips_binary_types() {
        let temp = fixture();

        let results = search_content(
            temp.path(),
            &Query::new("budget").unwrap(),
            &SearchOptions::default(),
            &ExclusionPolicy::new(),
            &Operation::detached(),
        )
        .unwrap();

        let names: Vec<_> = results.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Budget notes.md"]);
        assert_eq!(results[0].match_line_number, Some(2));
        assert_eq!(results[0].match_context.as_deref(), Some("the BUDGET is tight"));
    }

    #[test]
    fn test_content_filters_apply_before_open() {
        let temp = fixture();
        let options = SearchOptions::builder()
            .filters(SearchFilters {
                file_type: FileTypeClass::Code,
                ..Default::default()
            })
            .build()
            .unwrap();

        let results = search_content(
            temp.path(),
            &Query::new("budget").unwrap(),
            &options,
            &ExclusionPolicy::new(),
            &Operation::detached(),
        )
        .unwrap();
        assert!(results.is_empty());
    }
}
