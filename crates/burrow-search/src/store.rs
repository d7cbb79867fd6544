//! Persisted flat index.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use burrow_core::{EngineError, EngineResult, Entry};

/// Version written into every saved index.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// On-disk layout of the index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedIndex {
    pub entries: Vec<Entry>,
    pub last_index_time: DateTime<Utc>,
    pub format_version: u32,
}

/// What `load` reports, including the absent case.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSnapshot {
    pub exists: bool,
    pub entries: Vec<Entry>,
    pub last_index_time: Option<DateTime<Utc>>,
    pub format_version: Option<u32>,
    pub entry_count: usize,
}

impl IndexSnapshot {
    fn absent() -> Self {
        Self {
            exists: false,
            entries: Vec::new(),
            last_index_time: None,
            format_version: None,
            entry_count: 0,
        }
    }
}

/// Reads and writes the index file at one location.
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the index. A missing file is reported with `exists: false`; an
    /// unreadable or unparsable one is an error.
    pub fn load(&self) -> EngineResult<IndexSnapshot> {
        match self.read()? {
            None => Ok(IndexSnapshot::absent()),
            Some(index) => Ok(IndexSnapshot {
                exists: true,
                entry_count: index.entries.len(),
                last_index_time: Some(index.last_index_time),
                format_version: Some(index.format_version),
                entries: index.entries,
            }),
        }
    }

    /// Load the index for searching: missing, corrupted and empty indexes
    /// are each a distinct error.
    pub fn load_for_search(&self) -> EngineResult<PersistedIndex> {
        let index = self.read()?.ok_or_else(|| EngineError::IndexMissing {
            path: self.path.clone(),
        })?;
        if index.entries.is_empty() {
            return Err(EngineError::IndexEmpty {
                path: self.path.clone(),
            });
        }
        Ok(index)
    }

    /// Replace the index file.
    ///
    /// The data is written to a temporary file in the same directory and
    /// renamed over the target, so readers never see a partial file.
    pub fn save(&self, entries: &[Entry], last_index_time: DateTime<Utc>) -> EngineResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| EngineError::io(&dir, e))?;

        let index = IndexRef {
            entries,
            last_index_time,
            format_version: INDEX_FORMAT_VERSION,
        };

        let temp = NamedTempFile::new_in(&dir).map_err(|e| EngineError::io(&dir, e))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, &index).map_err(|e| EngineError::Other {
                message: format!("failed to serialize index: {e}"),
            })?;
            writer.flush().map_err(|e| EngineError::io(temp.path(), e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| EngineError::io(temp.path(), e))?;
        temp.persist(&self.path)
            .map_err(|e| EngineError::io(&self.path, e.error))?;

        tracing::info!(path = %self.path.display(), entries = entries.len(), "index saved");
        Ok(())
    }

    fn read(&self) -> EngineResult<Option<PersistedIndex>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(EngineError::io(&self.path, e)),
        };

        let index: PersistedIndex =
            serde_json::from_slice(&data).map_err(|e| EngineError::IndexCorrupted {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        if index.format_version != INDEX_FORMAT_VERSION {
            return Err(EngineError::IndexCorrupted {
                path: self.path.clone(),
                message: format!(
                    "format version {} (expected {INDEX_FORMAT_VERSION})",
                    index.format_version
                ),
            });
        }
        Ok(Some(index))
    }
}

/// Borrowing twin of [`PersistedIndex`] for serialization.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexRef<'a> {
    entries: &'a [Entry],
    last_index_time: DateTime<Utc>,
    format_version: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_missing_file_is_absent() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("index.json"));

        let snapshot = store.load().unwrap();
        assert!(!snapshot.exists);
        assert!(matches!(
            store.load_for_search(),
            Err(EngineError::IndexMissing { .. })
        ));
    }

    #[test]
    fn test_garbage_is_corrupted() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("index.json");
        fs::write(&path, "{\"entries\": [").unwrap();

        let store = IndexStore::new(&path);
        assert!(matches!(store.load(), Err(EngineError::IndexCorrupted { .. })));
    }

    #[test]
    fn test_version_mismatch_is_corrupted() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("index.json");
        fs::write(
            &path,
            r#"{"entries":[],"lastIndexTime":"2024-01-01T00:00:00Z","formatVersion":99}"#,
        )
        .unwrap();

        let err = IndexStore::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("format version 99"));
    }

    #[test]
    fn test_empty_index_for_search() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("nested/dir/index.json"));
        let when = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();

        store.save(&[], when).unwrap();
        let snapshot = store.load().unwrap();
        assert!(snapshot.exists);
        assert_eq!(snapshot.entry_count, 0);
        assert_eq!(snapshot.last_index_time, Some(when));
        assert!(matches!(
            store.load_for_search(),
            Err(EngineError::IndexEmpty { .. })
        ));
    }
}
