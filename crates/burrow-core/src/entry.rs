//! Filesystem entry records produced by walks and searches.

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// One filesystem object discovered during a walk or search.
///
/// Entries are value objects: they are never mutated once handed to a caller
/// and carry no identity beyond their path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// File/directory name (not full path).
    pub name: CompactString,

    /// Absolute path.
    pub path: PathBuf,

    /// Whether this is a directory.
    pub is_directory: bool,

    /// Whether this is a regular file.
    pub is_file: bool,

    /// Size in bytes (0 for directories).
    pub size: u64,

    /// Last modification time.
    pub modified: DateTime<Utc>,

    /// Hidden flag (false until resolved).
    #[serde(default)]
    pub is_hidden: bool,

    /// Trimmed excerpt around a content match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_context: Option<String>,

    /// 1-based line number of a content match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_line_number: Option<u32>,
}

impl Entry {
    /// Build an entry from a path and its metadata.
    pub fn from_metadata(path: impl Into<PathBuf>, metadata: &Metadata) -> Self {
        let path = path.into();
        let is_directory = metadata.is_dir();
        Self {
            name: file_name_of(&path),
            is_directory,
            is_file: metadata.is_file(),
            size: if is_directory { 0 } else { metadata.len() },
            modified: metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| epoch()),
            is_hidden: false,
            match_context: None,
            match_line_number: None,
            path,
        }
    }

    /// Build a placeholder entry when metadata could not be read.
    ///
    /// Size and modification time fall back to zero values.
    pub fn without_metadata(path: impl Into<PathBuf>, is_directory: bool) -> Self {
        let path = path.into();
        Self {
            name: file_name_of(&path),
            is_directory,
            is_file: !is_directory,
            size: 0,
            modified: epoch(),
            is_hidden: false,
            match_context: None,
            match_line_number: None,
            path,
        }
    }

    /// Lowercased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }

    /// Attach content-match metadata.
    pub fn with_match(mut self, context: String, line_number: u32) -> Self {
        self.match_context = Some(context);
        self.match_line_number = Some(line_number);
        self
    }

    /// Set the hidden flag.
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.is_hidden = hidden;
        self
    }
}

/// The Unix epoch, used when a modification time is unavailable.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from(std::time::UNIX_EPOCH)
}

/// Final path component as a compact string, or the whole path for roots.
pub fn file_name_of(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::new(path.to_string_lossy()))
}

/// Lowercased extension of a file name, without the dot.
///
/// Dot-files such as `.bashrc` have no extension.
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
