//! Hidden-attribute resolution.
//!
//! On POSIX platforms an entry is hidden when its name starts with a dot. On
//! Windows the hidden bit lives in the file attributes, so a query has to go
//! through an external process; those results are batched and cached.

use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use indexmap::IndexMap;

use burrow_core::EngineConfig;

/// A platform method for deciding whether paths are hidden.
pub trait HiddenStrategy: Send + Sync {
    /// Resolve one path.
    fn is_hidden(&self, path: &Path) -> io::Result<bool>;

    /// Resolve many paths with a single query.
    ///
    /// The returned map may be keyed by a differently-cased or normalized
    /// form of each path. Paths missing from the map are resolved one by one.
    fn resolve_batch(&self, paths: &[PathBuf]) -> io::Result<HashMap<PathBuf, bool>>;

    /// Whether results are expensive enough to be worth caching.
    fn uses_cache(&self) -> bool {
        true
    }
}

/// Dot-name check, no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotNameStrategy;

impl HiddenStrategy for DotNameStrategy {
    fn is_hidden(&self, path: &Path) -> io::Result<bool> {
        Ok(is_dot_name(path))
    }

    fn resolve_batch(&self, paths: &[PathBuf]) -> io::Result<HashMap<PathBuf, bool>> {
        Ok(paths.iter().map(|p| (p.clone(), is_dot_name(p))).collect())
    }

    fn uses_cache(&self) -> bool {
        false
    }
}

/// Queries the Windows hidden attribute bit.
///
/// Single paths go through `attrib`; batches go through one PowerShell
/// `Get-Item` invocation. Both processes are killed after `timeout`.
#[derive(Debug, Clone)]
pub struct AttributeStrategy {
    timeout: Duration,
}

impl AttributeStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl HiddenStrategy for AttributeStrategy {
    fn is_hidden(&self, path: &Path) -> io::Result<bool> {
        let mut cmd = Command::new("attrib");
        cmd.arg(path);
        let output = run_with_timeout(cmd, self.timeout)?;

        parse_attrib_output(&output, path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "unrecognized attrib output")
        })
    }

    fn resolve_batch(&self, paths: &[PathBuf]) -> io::Result<HashMap<PathBuf, bool>> {
        if paths.is_empty() {
            return Ok(HashMap::new());
        }

        let literal_paths = paths
            .iter()
            .map(|p| format!("'{}'", p.to_string_lossy().replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(",");
        let script = format!(
            "$ErrorActionPreference='SilentlyContinue'; \
             Get-Item -Force -LiteralPath {literal_paths} | ForEach-Object {{ \
             $_.FullName + '|' + [bool]($_.Attributes -band [IO.FileAttributes]::Hidden) }}"
        );

        let mut cmd = Command::new("powershell");
        cmd.args(["-NoProfile", "-NonInteractive", "-Command", &script]);
        let output = run_with_timeout(cmd, self.timeout)?;

        Ok(parse_batch_output(&output))
    }
}

/// Run a command and capture stdout, killing it after `timeout`.
fn run_with_timeout(mut cmd: Command, timeout: Duration) -> io::Result<String> {
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout unavailable"))?;

    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).map(|_| buf)
    });

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            let buf = reader
                .join()
                .map_err(|_| io::Error::other("stdout reader panicked"))??;
            if !status.success() && buf.is_empty() {
                return Err(io::Error::other(format!("attribute query exited with {status}")));
            }
            return Ok(String::from_utf8_lossy(&buf).into_owned());
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "attribute query timed out",
            ));
        }
        thread::sleep(Duration::from_millis(10));
    }
}

/// Parse `attrib` output: attribute letters precede the path on its line.
fn parse_attrib_output(output: &str, path: &Path) -> Option<bool> {
    let needle = path.to_string_lossy().to_ascii_lowercase();
    output.lines().find_map(|line| {
        let pos = line.to_ascii_lowercase().find(&needle)?;
        Some(line[..pos].contains('H'))
    })
}

/// Parse `FullName|True` lines.
fn parse_batch_output(output: &str) -> HashMap<PathBuf, bool> {
    output
        .lines()
        .filter_map(|line| {
            let (path, flag) = line.trim().rsplit_once('|')?;
            let hidden = match flag.trim() {
                f if f.eq_ignore_ascii_case("true") => true,
                f if f.eq_ignore_ascii_case("false") => false,
                _ => return None,
            };
            Some((PathBuf::from(path), hidden))
        })
        .collect()
}

/// Whether the final path component starts with a dot.
pub fn is_dot_name(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

/// Bounded map of resolved hidden flags with a time-to-live.
///
/// When full, the oldest-inserted key is evicted. Re-inserting a key moves
/// it to the back.
#[derive(Debug)]
pub struct HiddenCache {
    entries: IndexMap<PathBuf, (bool, Instant)>,
    capacity: usize,
    ttl: Duration,
}

impl HiddenCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Look up a path as of `now`. Expired entries are dropped and reported
    /// as absent.
    pub fn get_at(&mut self, path: &Path, now: Instant) -> Option<bool> {
        let (hidden, inserted) = *self.entries.get(path)?;
        if now.saturating_duration_since(inserted) >= self.ttl {
            self.entries.shift_remove(path);
            return None;
        }
        Some(hidden)
    }

    /// Record a flag resolved at `now`.
    pub fn insert_at(&mut self, path: PathBuf, hidden: bool, now: Instant) {
        if self.entries.shift_remove(&path).is_none() && self.entries.len() >= self.capacity {
            self.entries.shift_remove_index(0);
        }
        self.entries.insert(path, (hidden, now));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves hidden flags through a strategy and a shared cache.
///
/// Failures never propagate: a path whose attributes cannot be read is
/// reported as not hidden.
pub struct HiddenResolver {
    strategy: Box<dyn HiddenStrategy>,
    cache: Mutex<HiddenCache>,
}

impl HiddenResolver {
    pub fn new(strategy: Box<dyn HiddenStrategy>, cache: HiddenCache) -> Self {
        Self {
            strategy,
            cache: Mutex::new(cache),
        }
    }

    /// The resolver native to the current platform.
    pub fn for_platform(config: &EngineConfig) -> Self {
        let strategy: Box<dyn HiddenStrategy> = if cfg!(windows) {
            Box::new(AttributeStrategy::new(config.attribute_query_timeout()))
        } else {
            Box::new(DotNameStrategy)
        };
        Self::new(
            strategy,
            HiddenCache::new(config.hidden_cache_capacity, config.hidden_cache_ttl()),
        )
    }

    /// Resolve one path.
    pub fn is_hidden(&self, path: &Path) -> bool {
        self.is_hidden_at(path, Instant::now())
    }

    /// Resolve one path with an explicit clock reading.
    pub fn is_hidden_at(&self, path: &Path, now: Instant) -> bool {
        if is_dot_name(path) {
            return true;
        }
        if !self.strategy.uses_cache() {
            return self.query_single(path);
        }
        if let Some(hidden) = self.lock_cache().get_at(path, now) {
            return hidden;
        }

        let hidden = self.query_single(path);
        self.lock_cache().insert_at(path.to_path_buf(), hidden, now);
        hidden
    }

    /// Resolve many paths; the output lines up with `paths`.
    pub fn resolve_many(&self, paths: &[PathBuf]) -> Vec<bool> {
        self.resolve_many_at(paths, Instant::now())
    }

    /// Like [`resolve_many`](Self::resolve_many) with an explicit clock reading.
    pub fn resolve_many_at(&self, paths: &[PathBuf], now: Instant) -> Vec<bool> {
        let mut resolved: Vec<Option<bool>> = vec![None; paths.len()];
        let mut pending = Vec::new();

        {
            let mut cache = self.lock_cache();
            for (slot, path) in resolved.iter_mut().zip(paths) {
                if is_dot_name(path) {
                    *slot = Some(true);
                } else if self.strategy.uses_cache() {
                    *slot = cache.get_at(path, now);
                }
                if slot.is_none() {
                    pending.push(path.clone());
                }
            }
        }

        if !pending.is_empty() {
            let batch = match self.strategy.resolve_batch(&pending) {
                Ok(map) => map
                    .into_iter()
                    .map(|(path, hidden)| (batch_key(&path), hidden))
                    .collect(),
                Err(err) => {
                    tracing::warn!(count = pending.len(), %err, "batched hidden query failed, resolving one by one");
                    HashMap::new()
                }
            };

            let mut fresh = Vec::with_capacity(pending.len());
            for (slot, path) in resolved.iter_mut().zip(paths) {
                if slot.is_some() {
                    continue;
                }
                let hidden = match batch.get(&batch_key(path)) {
                    Some(&hidden) => hidden,
                    None => self.query_single(path),
                };
                *slot = Some(hidden);
                fresh.push((path.clone(), hidden));
            }

            if self.strategy.uses_cache() {
                let mut cache = self.lock_cache();
                for (path, hidden) in fresh {
                    cache.insert_at(path, hidden, now);
                }
            }
        }

        resolved.into_iter().map(|slot| slot.unwrap_or(false)).collect()
    }

    /// Number of cached flags.
    pub fn cached_len(&self) -> usize {
        self.lock_cache().len()
    }

    fn query_single(&self, path: &Path) -> bool {
        self.strategy.is_hidden(path).unwrap_or_else(|err| {
            tracing::debug!(path = %path.display(), %err, "hidden query failed, assuming visible");
            false
        })
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HiddenCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for HiddenResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HiddenResolver")
            .field("cached", &self.cached_len())
            .finish_non_exhaustive()
    }
}

/// Case- and separator-insensitive key for matching batch output to input.
fn batch_key(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .trim_end_matches('/')
        .to_lowercase()
}
