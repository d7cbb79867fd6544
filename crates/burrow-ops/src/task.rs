//! Task request and result types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use burrow_core::{Entry, SearchFilters, TaskKind};
use burrow_scan::{DirectoryListing, FolderSizeReport, IndexBuildReport};
use burrow_search::IndexSnapshot;

/// A unit of work and its payload.
///
/// Optional limits fall back to the engine configuration; an omitted
/// `indexPath` means the configured index location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Task {
    #[serde(rename_all = "camelCase")]
    BuildIndex {
        #[serde(default)]
        locations: Vec<PathBuf>,
        #[serde(default)]
        max_index_size: Option<usize>,
        /// Save the built index here when set.
        #[serde(default)]
        index_path: Option<PathBuf>,
    },
    #[serde(rename_all = "camelCase")]
    SearchFiles {
        dir_path: PathBuf,
        query: String,
        #[serde(default)]
        filters: SearchFilters,
        #[serde(default)]
        max_depth: Option<usize>,
        #[serde(default)]
        max_results: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    SearchContent {
        dir_path: PathBuf,
        query: String,
        #[serde(default)]
        filters: SearchFilters,
        #[serde(default)]
        max_depth: Option<usize>,
        #[serde(default)]
        max_results: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    SearchContentList {
        files: Vec<Entry>,
        query: String,
        #[serde(default)]
        filters: SearchFilters,
        #[serde(default)]
        max_results: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    SearchContentIndex {
        #[serde(default)]
        index_path: Option<PathBuf>,
        query: String,
        #[serde(default)]
        filters: SearchFilters,
        #[serde(default)]
        max_results: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    SearchIndex {
        #[serde(default)]
        index_path: Option<PathBuf>,
        query: String,
        #[serde(default)]
        filters: SearchFilters,
        #[serde(default)]
        max_results: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    FolderSize { folder_path: PathBuf },
    #[serde(rename_all = "camelCase")]
    Checksum {
        file_path: PathBuf,
        algorithms: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    ListDirectory {
        dir_path: PathBuf,
        #[serde(default)]
        batch_size: Option<usize>,
        #[serde(default)]
        include_hidden: bool,
    },
    #[serde(rename_all = "camelCase")]
    LoadIndex {
        #[serde(default)]
        index_path: Option<PathBuf>,
    },
    #[serde(rename_all = "camelCase")]
    SaveIndex {
        #[serde(default)]
        index_path: Option<PathBuf>,
        entries: Vec<Entry>,
        #[serde(default)]
        last_index_time: Option<DateTime<Utc>>,
    },
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::BuildIndex { .. } => TaskKind::BuildIndex,
            Self::SearchFiles { .. } => TaskKind::SearchFiles,
            Self::SearchContent { .. } => TaskKind::SearchContent,
            Self::SearchContentList { .. } => TaskKind::SearchContentList,
            Self::SearchContentIndex { .. } => TaskKind::SearchContentIndex,
            Self::SearchIndex { .. } => TaskKind::SearchIndex,
            Self::FolderSize { .. } => TaskKind::FolderSize,
            Self::Checksum { .. } => TaskKind::Checksum,
            Self::ListDirectory { .. } => TaskKind::ListDirectory,
            Self::LoadIndex { .. } => TaskKind::LoadIndex,
            Self::SaveIndex { .. } => TaskKind::SaveIndex,
        }
    }
}

/// A task addressed by request ID, optionally tied to a cancellable
/// operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub id: String,
    #[serde(default)]
    pub operation_id: Option<String>,
    pub task: Task,
}

impl TaskRequest {
    pub fn new(id: impl Into<String>, task: Task) -> Self {
        Self {
            id: id.into(),
            operation_id: None,
            task,
        }
    }

    pub fn with_operation(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }
}

/// Acknowledgement for a saved index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAck {
    pub path: PathBuf,
    pub entry_count: usize,
    pub last_index_time: DateTime<Utc>,
}

/// Kind-specific success payload.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TaskOutput {
    Index(IndexBuildReport),
    Entries(Vec<Entry>),
    FolderSize(FolderSizeReport),
    Checksum(IndexMap<String, String>),
    Listing(DirectoryListing),
    Snapshot(IndexSnapshot),
    Saved(SaveAck),
}

/// Final outcome of one request. Exactly one is produced per request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<TaskOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the failure is a cooperative cancellation.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl TaskResult {
    pub fn success(id: impl Into<String>, data: TaskOutput) -> Self {
        Self {
            id: id.into(),
            success: true,
            data: Some(data),
            error: None,
            cancelled: false,
        }
    }

    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            data: None,
            error: Some(error.into()),
            cancelled: false,
        }
    }

    pub fn cancelled(id: impl Into<String>) -> Self {
        Self {
            cancelled: true,
            ..Self::failure(id, "cancelled")
        }
    }
}
