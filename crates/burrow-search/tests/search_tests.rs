use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use burrow_core::{
    CancellationRegistry, EngineConfig, EngineError, Entry, ExclusionPolicy, FileTypeClass,
    Operation, SearchFilters,
};
use burrow_scan::{HiddenResolver, IndexBuilder};
use burrow_search::{
    IndexStore, Query, SearchOptions, excerpt, search_content, search_content_index,
    search_files, search_index,
};

fn entry(path: &Path) -> Entry {
    Entry::from_metadata(path, &fs::metadata(path).unwrap())
}

fn indexed_fixture() -> (TempDir, std::path::PathBuf) {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    fs::create_dir_all(data.join("src")).unwrap();
    fs::write(data.join("Cargo.toml"), "[package]\nname = \"demo\"\n").unwrap();
    fs::write(data.join("src/main.rs"), "fn main() {\n    demo::run();\n}\n").unwrap();
    fs::write(data.join("src/demo.rs"), "pub fn run() {}\n").unwrap();
    fs::write(data.join("demo.png"), [0x89, 0x50, 0x4e, 0x47]).unwrap();

    let config = EngineConfig::default();
    let policy = ExclusionPolicy::new();
    let report = IndexBuilder::new(&config, &policy)
        .build(&[data], 1000, &Operation::detached(), &burrow_core::NoProgress)
        .unwrap();

    let index_path = temp.path().join("index.json");
    IndexStore::new(&index_path)
        .save(&report.entries, Utc::now())
        .unwrap();
    (temp, index_path)
}

#[test]
fn test_save_load_round_trip_preserves_order() {
    let temp = TempDir::new().unwrap();
    let mut entries = Vec::new();
    for name in ["zeta.txt", "alpha.txt", "mid.rs"] {
        let path = temp.path().join(name);
        fs::write(&path, name).unwrap();
        entries.push(entry(&path));
    }
    entries[1] = entries[1].clone().with_match("alpha".into(), 1);
    let when = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 58).unwrap();

    let store = IndexStore::new(temp.path().join("index.json"));
    store.save(&entries, when).unwrap();
    let snapshot = store.load().unwrap();

    assert!(snapshot.exists);
    assert_eq!(snapshot.entries, entries);
    assert_eq!(snapshot.last_index_time, Some(when));
    assert_eq!(snapshot.format_version, Some(burrow_search::INDEX_FORMAT_VERSION));
}

#[test]
fn test_save_overwrites_previous_index() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a.txt");
    fs::write(&path, "a").unwrap();

    let store = IndexStore::new(temp.path().join("index.json"));
    store.save(&[entry(&path), entry(&path)], Utc::now()).unwrap();
    store.save(&[entry(&path)], Utc::now()).unwrap();

    assert_eq!(store.load().unwrap().entry_count, 1);
}

#[test]
fn test_index_errors_are_distinct() {
    let temp = TempDir::new().unwrap();
    let query = Query::new("x").unwrap();
    let options = SearchOptions::default();
    let op = Operation::detached();

    let missing = temp.path().join("missing.json");
    let err = search_index(&missing, &query, &options, &op).unwrap_err();
    assert!(matches!(err, EngineError::IndexMissing { .. }));

    let corrupted = temp.path().join("corrupted.json");
    fs::write(&corrupted, "not json at all").unwrap();
    let err = search_index(&corrupted, &query, &options, &op).unwrap_err();
    assert!(matches!(err, EngineError::IndexCorrupted { .. }));

    let empty = temp.path().join("empty.json");
    IndexStore::new(&empty).save(&[], Utc::now()).unwrap();
    let err = search_content_index(&empty, &query, &options, &op).unwrap_err();
    assert!(matches!(err, EngineError::IndexEmpty { .. }));
}

#[test]
fn test_index_name_search_ranks_and_filters() {
    let (_temp, index_path) = indexed_fixture();
    let op = Operation::detached();

    let results = search_index(
        &index_path,
        &Query::new("demo.rs").unwrap(),
        &SearchOptions::default(),
        &op,
    )
    .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "demo.rs");

    let images = SearchOptions::builder()
        .filters(SearchFilters {
            file_type: FileTypeClass::Images,
            ..Default::default()
        })
        .build()
        .unwrap();
    let results = search_index(&index_path, &Query::new("DEMO").unwrap(), &images, &op).unwrap();
    let names: Vec<_> = results.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["demo.png"]);
}

#[test]
fn test_index_content_search_opens_text_only() {
    let (_temp, index_path) = indexed_fixture();

    let results = search_content_index(
        &index_path,
        &Query::new("demo").unwrap(),
        &SearchOptions::default(),
        &Operation::detached(),
    )
    .unwrap();

    let mut names: Vec<_> = results.iter().map(|e| e.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Cargo.toml", "main.rs"]);
    let main = results.iter().find(|e| e.name == "main.rs").unwrap();
    assert_eq!(main.match_line_number, Some(2));
    assert_eq!(main.match_context.as_deref(), Some("demo::run();"));
}

#[test]
fn test_content_excerpt_bounds() {
    let query = Query::new("hit").unwrap();
    for left in [0usize, 10, 59, 60, 61, 200] {
        for right in [0usize, 30, 60, 61, 150] {
            let line = format!("{}hit{}", "L".repeat(left), "R".repeat(right));
            let text = excerpt(&line, &query, 60).unwrap();

            let (before, after) = text.split_once("hit").unwrap();
            let before = before.trim_start_matches("...");
            let after = after.trim_end_matches("...");
            assert!(before.chars().count() <= 60);
            assert!(after.chars().count() <= 60);
            assert_eq!(text.starts_with("..."), left > 60, "left={left}");
            assert_eq!(text.ends_with("..."), right > 60, "right={right}");
        }
    }
}

#[test]
fn test_cancelled_content_search() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.txt"), "needle").unwrap();

    let registry = Arc::new(CancellationRegistry::new());
    registry.cancel("grep");
    let op = Operation::new(Arc::clone(&registry), Some("grep"));

    let result = search_content(
        temp.path(),
        &Query::new("needle").unwrap(),
        &SearchOptions::default(),
        &ExclusionPolicy::new(),
        &op,
    );
    assert!(matches!(result, Err(EngineError::Cancelled)));
}

#[test]
fn test_name_search_marks_hidden_matches() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(".env.local"), "x").unwrap();
    fs::write(temp.path().join("env.rs"), "x").unwrap();

    let resolver = HiddenResolver::for_platform(&EngineConfig::default());
    let results = search_files(
        temp.path(),
        &Query::new("env").unwrap(),
        &SearchOptions::default(),
        &ExclusionPolicy::new(),
        &resolver,
        &Operation::detached(),
    )
    .unwrap();

    let flags: Vec<_> = results
        .iter()
        .map(|e| (e.name.as_str(), e.is_hidden))
        .collect();
    assert_eq!(flags, vec![(".env.local", true), ("env.rs", false)]);
}
