//! Explicit-stack directory traversal.

use std::fs;
use std::path::{Path, PathBuf};

use compact_str::CompactString;

use burrow_core::{EngineError, EngineResult, ExclusionPolicy, Operation};

/// A child discovered while listing a directory.
///
/// Only the directory listing is consulted to build this, so no stat call
/// has been made yet. Symlinks are reported as non-directories and never
/// descended into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkItem {
    /// Full path.
    pub path: PathBuf,
    /// File name.
    pub name: CompactString,
    /// Whether this is a directory.
    pub is_dir: bool,
    /// Depth below the walk root (root's children are depth 0).
    pub depth: usize,
}

/// Whether a walk should keep going after a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop immediately; the remaining stack is discarded.
    Stop,
}

/// Receives one call per directory listed by a [`TreeWalker`].
pub trait WalkVisitor {
    fn visit(&mut self, dir: &Path, children: &[WalkItem]) -> EngineResult<Flow>;
}

impl<F> WalkVisitor for F
where
    F: FnMut(&Path, &[WalkItem]) -> EngineResult<Flow>,
{
    fn visit(&mut self, dir: &Path, children: &[WalkItem]) -> EngineResult<Flow> {
        self(dir, children)
    }
}

/// Counters returned when a walk finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories successfully listed.
    pub dirs_read: u64,
    /// Directories skipped because they could not be listed.
    pub dirs_skipped: u64,
    /// Whether a visitor stopped the walk early.
    pub stopped: bool,
}

struct Frame {
    dir: PathBuf,
    depth: usize,
}

/// Iterative depth-first walker.
///
/// Uses a heap-allocated stack of pending directories, so tree depth never
/// grows the call stack. A directory that cannot be listed is skipped; the
/// walk only fails on cancellation or when the root itself is unusable.
pub struct TreeWalker<'a> {
    op: &'a Operation,
    exclusion: Option<&'a ExclusionPolicy>,
    max_depth: Option<usize>,
}

impl<'a> TreeWalker<'a> {
    /// Create a walker bound to an operation.
    pub fn new(op: &'a Operation) -> Self {
        Self {
            op,
            exclusion: None,
            max_depth: None,
        }
    }

    /// Skip excluded directories (no descent) and files (not reported).
    pub fn with_exclusion(mut self, policy: &'a ExclusionPolicy) -> Self {
        self.exclusion = Some(policy);
        self
    }

    /// Do not descend into directories deeper than `depth`.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Walk the tree under `root`.
    pub fn walk(&self, root: &Path, visitor: &mut impl WalkVisitor) -> EngineResult<WalkStats> {
        ensure_directory(root)?;

        let mut stats = WalkStats::default();
        let mut stack = vec![Frame {
            dir: root.to_path_buf(),
            depth: 0,
        }];

        while let Some(frame) = stack.pop() {
            self.op.check()?;

            let mut children = match read_children(&frame.dir, frame.depth, self.op) {
                Ok(children) => children,
                Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
                Err(err) => {
                    tracing::debug!(dir = %frame.dir.display(), %err, "skipping unreadable directory");
                    stats.dirs_skipped += 1;
                    continue;
                }
            };
            stats.dirs_read += 1;

            if let Some(policy) = self.exclusion {
                children.retain(|item| !policy.should_exclude_within(root, &item.path));
            }

            if visitor.visit(&frame.dir, &children)? == Flow::Stop {
                stats.stopped = true;
                break;
            }

            let child_depth = frame.depth + 1;
            if self.max_depth.is_some_and(|max| child_depth > max) {
                continue;
            }
            // reversed so the alphabetically first directory is popped next
            for item in children.iter().rev().filter(|item| item.is_dir) {
                stack.push(Frame {
                    dir: item.path.clone(),
                    depth: child_depth,
                });
            }
        }

        Ok(stats)
    }
}

/// Fail unless `path` is an existing directory.
pub fn ensure_directory(path: &Path) -> EngineResult<()> {
    let metadata = fs::metadata(path).map_err(|e| EngineError::io(path, e))?;
    if !metadata.is_dir() {
        return Err(EngineError::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// List one directory, sorted by name.
///
/// Entries whose listing record cannot be read, or whose name is not valid
/// UTF-8, are skipped. Cancellation is checked per entry.
pub fn read_children(dir: &Path, depth: usize, op: &Operation) -> EngineResult<Vec<WalkItem>> {
    let reader = fs::read_dir(dir).map_err(|e| EngineError::io(dir, e))?;

    let mut children = Vec::new();
    for entry in reader {
        op.check()?;

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(dir = %dir.display(), %err, "skipping unreadable entry");
                continue;
            }
        };
        // paths travel as JSON strings, so names must be valid UTF-8
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            tracing::debug!(dir = %dir.display(), name = ?file_name, "skipping non-UTF-8 name");
            continue;
        };
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

        children.push(WalkItem {
            name: CompactString::new(name),
            path: entry.path(),
            is_dir,
            depth,
        });
    }

    children.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(children)
}
