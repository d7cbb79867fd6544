use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use burrow_core::{
    CancellationRegistry, EngineConfig, EngineError, ExclusionPolicy, NoProgress, Operation,
    ProgressData,
};
use burrow_scan::{
    Flow, HiddenCache, HiddenResolver, HiddenStrategy, IndexBuilder, TreeWalker, WalkItem,
    folder_size,
};
use tempfile::TempDir;

/// Marks names containing "hid" as hidden; the batch query always fails.
struct FailingBatch {
    single_calls: Arc<AtomicUsize>,
}

impl HiddenStrategy for FailingBatch {
    fn is_hidden(&self, path: &Path) -> io::Result<bool> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        Ok(path.to_string_lossy().contains("hid"))
    }

    fn resolve_batch(&self, _paths: &[PathBuf]) -> io::Result<HashMap<PathBuf, bool>> {
        Err(io::Error::new(io::ErrorKind::TimedOut, "batch timed out"))
    }
}

/// Answers batches, but silently leaves out every other path.
struct PartialBatch {
    single_calls: Arc<AtomicUsize>,
}

impl HiddenStrategy for PartialBatch {
    fn is_hidden(&self, path: &Path) -> io::Result<bool> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        Ok(path.to_string_lossy().contains("hid"))
    }

    fn resolve_batch(&self, paths: &[PathBuf]) -> io::Result<HashMap<PathBuf, bool>> {
        Ok(paths
            .iter()
            .step_by(2)
            .map(|p| (p.clone(), p.to_string_lossy().contains("hid")))
            .collect())
    }
}

fn counting_resolver<S: HiddenStrategy + 'static>(
    make: impl FnOnce(Arc<AtomicUsize>) -> S,
) -> (HiddenResolver, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let resolver = HiddenResolver::new(
        Box::new(make(Arc::clone(&calls))),
        HiddenCache::new(100, Duration::from_secs(300)),
    );
    (resolver, calls)
}

fn sample_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("C:/data/hid-one.txt"),
        PathBuf::from("C:/data/plain.txt"),
        PathBuf::from("C:/data/.dotfile"),
        PathBuf::from("C:/data/hid-two"),
        PathBuf::from("C:/data/report.pdf"),
    ]
}

#[test]
fn test_failed_batch_still_resolves_every_path() {
    let (resolver, calls) = counting_resolver(|single_calls| FailingBatch { single_calls });
    let paths = sample_paths();

    let hidden = resolver.resolve_many(&paths);

    assert_eq!(hidden, vec![true, false, true, true, false]);
    // the dot-name shortcut needs no query
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(resolver.cached_len(), 4);
}

#[test]
fn test_partial_batch_fills_gaps_one_by_one() {
    let (resolver, calls) = counting_resolver(|single_calls| PartialBatch { single_calls });
    let paths = sample_paths();

    let hidden = resolver.resolve_many(&paths);

    assert_eq!(hidden, vec![true, false, true, true, false]);
    // four pending paths, the batch answered two of them
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cache_serves_until_ttl_then_requeries() {
    let (resolver, calls) = counting_resolver(|single_calls| FailingBatch { single_calls });
    let path = Path::new("C:/data/hid-one.txt");
    let t0 = Instant::now();
    let ttl = Duration::from_millis(300_000);

    assert!(resolver.is_hidden_at(path, t0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(resolver.is_hidden_at(path, t0 + ttl - Duration::from_millis(1)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(resolver.is_hidden_at(path, t0 + ttl));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_hidden_cache_ttl_boundary() {
    let mut cache = HiddenCache::new(10, Duration::from_secs(300));
    let t0 = Instant::now();
    cache.insert_at(PathBuf::from("/a"), true, t0);

    assert_eq!(
        cache.get_at(Path::new("/a"), t0 + Duration::from_millis(299_999)),
        Some(true)
    );
    assert_eq!(
        cache.get_at(Path::new("/a"), t0 + Duration::from_millis(300_000)),
        None
    );
    assert!(cache.is_empty());
}

fn deep_tree(levels: usize) -> TempDir {
    let temp = TempDir::new().unwrap();
    let mut dir = temp.path().to_path_buf();
    for i in 0..levels {
        dir.push(format!("d{i}"));
    }
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("bottom.txt"), "deep").unwrap();
    temp
}

#[test]
fn test_walker_handles_deep_trees() {
    let temp = deep_tree(40);
    let op = Operation::detached();
    let mut found = Vec::new();

    TreeWalker::new(&op)
        .walk(temp.path(), &mut |_: &Path, children: &[WalkItem]| -> Result<Flow, EngineError> {
            found.extend(children.iter().filter(|c| !c.is_dir).map(|c| c.depth));
            Ok(Flow::Continue)
        })
        .unwrap();

    assert_eq!(found, vec![40]);
}

#[test]
fn test_index_build_applies_extra_patterns() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("build")).unwrap();
    fs::write(temp.path().join("keep.rs"), "fn main() {}").unwrap();
    fs::write(temp.path().join("scratch.tmp"), "x").unwrap();
    fs::write(temp.path().join("build/out.o"), "x").unwrap();

    let config = EngineConfig::builder()
        .extra_exclude_patterns(vec!["*.tmp".to_string(), "**/build".to_string()])
        .build()
        .unwrap();
    let policy = config.exclusion_policy().unwrap();

    let report = IndexBuilder::new(&config, &policy)
        .build(
            &[temp.path().to_path_buf()],
            config.max_index_size,
            &Operation::detached(),
            &NoProgress,
        )
        .unwrap();

    let names: Vec<_> = report.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["keep.rs"]);
}

#[test]
fn test_cancelled_index_build_returns_cancelled() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.txt"), "a").unwrap();

    let registry = Arc::new(CancellationRegistry::new());
    registry.cancel("idx");
    let op = Operation::new(Arc::clone(&registry), Some("idx"));

    let config = EngineConfig::default();
    let policy = ExclusionPolicy::new();
    let result = IndexBuilder::new(&config, &policy).build(
        &[temp.path().to_path_buf()],
        100,
        &op,
        &NoProgress,
    );

    assert!(matches!(result, Err(EngineError::Cancelled)));
}

#[test]
fn test_folder_size_reports_walk_progress() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.bin"), vec![1u8; 64]).unwrap();

    let seen = Mutex::new(Vec::new());
    let sink = |data: ProgressData| seen.lock().unwrap().push(data);
    let report = folder_size(
        temp.path(),
        &EngineConfig::default(),
        &Operation::detached(),
        &sink,
    )
    .unwrap();

    assert_eq!(report.total_size, 64);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(matches!(
        seen[0],
        ProgressData::Walk {
            calculated_size: 64,
            file_count: 1,
            ..
        }
    ));
}
