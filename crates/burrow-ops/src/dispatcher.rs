//! Routes task requests to the engine components.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use burrow_core::{
    CancellationRegistry, EngineConfig, EngineError, EngineResult, ExclusionPolicy, Operation,
    ProgressSink, SearchFilters,
};
use burrow_scan::{HiddenResolver, IndexBuilder, folder_size, list_directory};
use burrow_search::{
    IndexStore, Query, SearchOptions, search_content, search_content_index, search_content_list,
    search_files, search_index,
};

use crate::checksum::{checksum, parse_algorithms};
use crate::task::{SaveAck, Task, TaskOutput, TaskRequest, TaskResult};

/// Single entry point for running tasks.
///
/// Owns the cancellation registry and the hidden-attribute cache shared by
/// every task it runs. Safe to share between threads.
#[derive(Debug)]
pub struct Dispatcher {
    config: EngineConfig,
    policy: ExclusionPolicy,
    registry: Arc<CancellationRegistry>,
    resolver: HiddenResolver,
}

/// Releases an operation's registry slot when dropped.
struct ClearOnDrop<'a>(&'a Operation);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.clear();
    }
}

impl Dispatcher {
    /// Create a dispatcher with the platform hidden-attribute resolver.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let resolver = HiddenResolver::for_platform(&config);
        Self::with_resolver(config, resolver)
    }

    /// Create a dispatcher with a custom resolver.
    pub fn with_resolver(config: EngineConfig, resolver: HiddenResolver) -> EngineResult<Self> {
        config.check()?;
        let policy = config.exclusion_policy()?;
        Ok(Self {
            config,
            policy,
            registry: Arc::new(CancellationRegistry::new()),
            resolver,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CancellationRegistry> {
        &self.registry
    }

    /// Mark an operation cancelled. Takes effect even if its task has not
    /// started yet.
    pub fn cancel(&self, operation_id: &str) {
        tracing::debug!(operation_id, "cancel requested");
        self.registry.cancel(operation_id);
    }

    /// Run one request to completion.
    ///
    /// Never panics on task failure: errors become failure results, and a
    /// cancellation becomes a result flagged `cancelled`. The operation's
    /// registry slot is always cleared.
    pub fn handle(&self, request: TaskRequest, progress: &dyn ProgressSink) -> TaskResult {
        let TaskRequest {
            id,
            operation_id,
            task,
        } = request;
        let kind = task.kind();
        let op = Operation::new(Arc::clone(&self.registry), operation_id.as_deref());
        let _clear = ClearOnDrop(&op);

        tracing::info!(id = %id, kind = %kind, operation_id = ?operation_id, "task started");
        match self.run(task, &op, progress) {
            Ok(output) => {
                tracing::info!(id = %id, kind = %kind, "task finished");
                TaskResult::success(id, output)
            }
            Err(EngineError::Cancelled) => {
                tracing::debug!(id = %id, kind = %kind, "task cancelled");
                TaskResult::cancelled(id)
            }
            Err(err) => {
                tracing::warn!(id = %id, kind = %kind, error = %err, "task failed");
                TaskResult::failure(id, err.to_string())
            }
        }
    }

    fn run(
        &self,
        task: Task,
        op: &Operation,
        progress: &dyn ProgressSink,
    ) -> EngineResult<TaskOutput> {
        let config = &self.config;
        match task {
            Task::BuildIndex {
                locations,
                max_index_size,
                index_path,
            } => {
                let locations = if locations.is_empty() {
                    config.index_locations.clone()
                } else {
                    locations
                };
                let max = max_index_size.unwrap_or(config.max_index_size);
                let report =
                    IndexBuilder::new(config, &self.policy).build(&locations, max, op, progress)?;

                if let Some(path) = index_path {
                    op.check()?;
                    IndexStore::new(path).save(&report.entries, Utc::now())?;
                }
                Ok(TaskOutput::Index(report))
            }

            Task::SearchFiles {
                dir_path,
                query,
                filters,
                max_depth,
                max_results,
            } => {
                let query = Query::new(&query)?;
                let options = self.options(filters, max_depth, max_results);
                let results =
                    search_files(&dir_path, &query, &options, &self.policy, &self.resolver, op)?;
                Ok(TaskOutput::Entries(results))
            }

            Task::SearchContent {
                dir_path,
                query,
                filters,
                max_depth,
                max_results,
            } => {
                let query = Query::new(&query)?;
                let options = self.options(filters, max_depth, max_results);
                let results = search_content(&dir_path, &query, &options, &self.policy, op)?;
                Ok(TaskOutput::Entries(results))
            }

            Task::SearchContentList {
                files,
                query,
                filters,
                max_results,
            } => {
                let query = Query::new(&query)?;
                let options = self.options(filters, None, max_results);
                let results = search_content_list(&files, &query, &options, op)?;
                Ok(TaskOutput::Entries(results))
            }

            Task::SearchContentIndex {
                index_path,
                query,
                filters,
                max_results,
            } => {
                let query = Query::new(&query)?;
                let options = self.options(filters, None, max_results);
                let path = self.index_path(index_path);
                let results = search_content_index(&path, &query, &options, op)?;
                Ok(TaskOutput::Entries(results))
            }

            Task::SearchIndex {
                index_path,
                query,
                filters,
                max_results,
            } => {
                let query = Query::new(&query)?;
                let options = self.options(filters, None, max_results);
                let path = self.index_path(index_path);
                let results = search_index(&path, &query, &options, op)?;
                Ok(TaskOutput::Entries(results))
            }

            Task::FolderSize { folder_path } => {
                let report = folder_size(&folder_path, config, op, progress)?;
                Ok(TaskOutput::FolderSize(report))
            }

            Task::Checksum {
                file_path,
                algorithms,
            } => {
                let algorithms = parse_algorithms(&algorithms)?;
                let digests = checksum(&file_path, &algorithms, config, op, progress)?;
                Ok(TaskOutput::Checksum(digests))
            }

            Task::ListDirectory {
                dir_path,
                batch_size,
                include_hidden,
            } => {
                let batch_size = batch_size.unwrap_or(config.listing_batch);
                if batch_size == 0 {
                    return Err(EngineError::invalid("batchSize must be positive"));
                }
                let listing = list_directory(
                    &dir_path,
                    batch_size,
                    include_hidden,
                    &self.resolver,
                    op,
                    progress,
                )?;
                Ok(TaskOutput::Listing(listing))
            }

            Task::LoadIndex { index_path } => {
                let path = self.index_path(index_path);
                let snapshot = IndexStore::new(path).load()?;
                Ok(TaskOutput::Snapshot(snapshot))
            }

            Task::SaveIndex {
                index_path,
                entries,
                last_index_time,
            } => {
                let path = self.index_path(index_path);
                let last_index_time = last_index_time.unwrap_or_else(Utc::now);
                IndexStore::new(&path).save(&entries, last_index_time)?;
                Ok(TaskOutput::Saved(SaveAck {
                    path,
                    entry_count: entries.len(),
                    last_index_time,
                }))
            }
        }
    }

    fn options(
        &self,
        filters: SearchFilters,
        max_depth: Option<usize>,
        max_results: Option<usize>,
    ) -> SearchOptions {
        let defaults = SearchOptions::from_config(&self.config);
        SearchOptions {
            filters,
            max_depth: max_depth.unwrap_or(defaults.max_depth),
            max_results: max_results.unwrap_or(defaults.max_results),
            ..defaults
        }
    }

    fn index_path(&self, requested: Option<PathBuf>) -> PathBuf {
        requested.unwrap_or_else(|| self.config.index_path.clone())
    }
}
