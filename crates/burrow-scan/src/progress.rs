//! Running totals for tree walks.

use std::path::{Path, PathBuf};

use burrow_core::ProgressData;

/// Counters accumulated while walking a tree.
///
/// Snapshots become [`ProgressData::Walk`] payloads.
#[derive(Debug, Clone, Default)]
pub struct WalkTracker {
    calculated_size: u64,
    file_count: u64,
    folder_count: u64,
    current_path: PathBuf,
}

impl WalkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_file(&mut self, size: u64) {
        self.file_count += 1;
        self.calculated_size += size;
    }

    pub fn record_dir(&mut self) {
        self.folder_count += 1;
    }

    pub fn set_current_path(&mut self, path: &Path) {
        self.current_path = path.to_path_buf();
    }

    pub fn calculated_size(&self) -> u64 {
        self.calculated_size
    }

    pub fn file_count(&self) -> u64 {
        self.file_count
    }

    pub fn folder_count(&self) -> u64 {
        self.folder_count
    }

    pub fn snapshot(&self) -> ProgressData {
        ProgressData::Walk {
            calculated_size: self.calculated_size,
            file_count: self.file_count,
            folder_count: self.folder_count,
            current_path: self.current_path.clone(),
        }
    }
}
