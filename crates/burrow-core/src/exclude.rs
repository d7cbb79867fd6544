//! Path exclusion rules for index builds and tree searches.

use std::path::{Component, Path};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{EngineError, EngineResult};

/// Lowercase file names that are never indexed: OS swap files, volume
/// metadata and desktop metadata files.
const EXCLUDED_FILE_NAMES: &[&str] = &[
    ".ds_store",
    ".localized",
    ".volumeicon.icns",
    ".com.apple.timemachine.donotpresent",
    "desktop.ini",
    "thumbs.db",
    "ehthumbs.db",
    "iconcache.db",
    "pagefile.sys",
    "hiberfil.sys",
    "swapfile.sys",
    "ntuser.dat",
    "ntuser.dat.log",
    ".lock",
];

/// Lowercase directory names that exclude every path beneath them.
const EXCLUDED_DIR_NAMES: &[&str] = &[
    // version control internals
    ".git",
    ".svn",
    ".hg",
    ".bzr",
    // package manager caches
    "node_modules",
    "bower_components",
    "__pycache__",
    ".npm",
    ".yarn",
    ".pnpm-store",
    ".gradle",
    ".m2",
    ".cargo",
    ".rustup",
    ".cache",
    ".venv",
    // OS and program directories
    "windows",
    "program files",
    "program files (x86)",
    "programdata",
    "appdata",
    "system volume information",
    "$windows.~bt",
    "$windows.~ws",
    ".spotlight-v100",
    ".fseventsd",
    ".documentrevisions-v100",
    ".temporaryitems",
    "lost+found",
    // trash folders
    "$recycle.bin",
    ".trash",
    ".trashes",
    ".local/share/trash",
];

/// Decides which paths a tree walk should skip.
///
/// Built-in rules are exact matches against lowercase names; user patterns
/// are globs matched against both the file name and the full path.
#[derive(Debug, Clone, Default)]
pub struct ExclusionPolicy {
    extra: Option<GlobSet>,
}

impl ExclusionPolicy {
    /// Policy with only the built-in rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy with additional glob patterns.
    pub fn with_patterns<S: AsRef<str>>(patterns: &[S]) -> EngineResult<Self> {
        if patterns.is_empty() {
            return Ok(Self::new());
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern.as_ref()).map_err(|e| {
                EngineError::invalid(format!("bad exclude pattern '{}': {e}", pattern.as_ref()))
            })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| EngineError::invalid(format!("bad exclude patterns: {e}")))?;

        Ok(Self { extra: Some(set) })
    }

    /// Whether a path should be skipped.
    pub fn should_exclude(&self, path: &Path) -> bool {
        if is_blocklisted(path) {
            return true;
        }

        match &self.extra {
            Some(set) => {
                set.is_match(path) || path.file_name().is_some_and(|name| set.is_match(name))
            }
            None => false,
        }
    }

    /// Like [`should_exclude`](Self::should_exclude), but built-in segment
    /// rules only look at the part of `path` below `root`.
    ///
    /// A walk rooted inside an excluded directory (for instance a location
    /// under `AppData`) still sees its own contents.
    pub fn should_exclude_within(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        if relative.as_os_str().is_empty() {
            return false;
        }
        if is_blocklisted(relative) {
            return true;
        }

        match &self.extra {
            Some(set) => {
                set.is_match(path) || path.file_name().is_some_and(|name| set.is_match(name))
            }
            None => false,
        }
    }
}

/// Built-in exclusion check.
pub fn should_exclude(path: &Path) -> bool {
    is_blocklisted(path)
}

fn is_blocklisted(path: &Path) -> bool {
    if let Some(name) = path.file_name() {
        let name = name.to_string_lossy().to_lowercase();
        if EXCLUDED_FILE_NAMES.contains(&name.as_str()) {
            return true;
        }
    }

    let segments: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_lowercase()),
            _ => None,
        })
        .collect();

    for (i, segment) in segments.iter().enumerate() {
        if EXCLUDED_DIR_NAMES.contains(&segment.as_str()) {
            return true;
        }
        // multi-segment rules such as `.local/share/trash`
        if i >= 2 {
            let joined = format!("{}/{}/{}", segments[i - 2], segments[i - 1], segment);
            if EXCLUDED_DIR_NAMES.contains(&joined.as_str()) {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_excluded_segments_any_case() {
        assert!(should_exclude(Path::new("/home/u/project/node_modules/left-pad/index.js")));
        assert!(should_exclude(Path::new("/home/u/project/.GIT/HEAD")));
        assert!(should_exclude(Path::new("C:/Program Files/App/app.exe")));
        assert!(should_exclude(Path::new("/home/u/.local/share/Trash/files/x.txt")));
    }

    #[test]
    fn test_excluded_file_names() {
        assert!(should_exclude(Path::new("/Users/u/Desktop/.DS_Store")));
        assert!(should_exclude(Path::new("D:/photos/Thumbs.db")));
        assert!(should_exclude(Path::new("C:/pagefile.sys")));
    }

    #[test]
    fn test_ordinary_paths_pass() {
        assert!(!should_exclude(Path::new("/home/u/docs/report.txt")));
        assert!(!should_exclude(Path::new("/home/u/git-notes/readme.md")));
        assert!(!should_exclude(Path::new("/home/u/my_node_modules_backup/a.js")));
        assert!(!should_exclude(Path::new("/home/u/share/trash.txt")));
    }

    #[test]
    fn test_extra_patterns() {
        let policy = ExclusionPolicy::with_patterns(&["*.tmp", "**/build/**"]).unwrap();
        assert!(policy.should_exclude(&PathBuf::from("/w/scratch.tmp")));
        assert!(policy.should_exclude(&PathBuf::from("/w/build/out.o")));
        assert!(policy.should_exclude(&PathBuf::from("/w/.git/config")));
        assert!(!policy.should_exclude(&PathBuf::from("/w/src/main.rs")));
    }

    #[test]
    fn test_within_root_ignores_ancestors() {
        let policy = ExclusionPolicy::new();
        let root = Path::new("C:/Users/u/AppData/Local/Temp/work");

        assert!(!policy.should_exclude_within(root, &root.join("notes.txt")));
        assert!(policy.should_exclude_within(root, &root.join(".git/HEAD")));
        assert!(!policy.should_exclude_within(root, root));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = ExclusionPolicy::with_patterns(&["a[b"]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { .. }));
    }
}
