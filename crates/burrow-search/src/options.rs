//! Search limits and filters.

use derive_builder::Builder;

use burrow_core::{EngineConfig, SearchFilters};

/// Options shared by every search mode.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct SearchOptions {
    /// Caller filters (type class, size and date ranges).
    #[builder(default)]
    pub filters: SearchFilters,

    /// Deepest directory level a live search descends into.
    #[builder(default = "10")]
    pub max_depth: usize,

    /// Result cap; the walk stops once it is reached.
    #[builder(default = "500")]
    pub max_results: usize,

    /// Largest file content search opens.
    #[builder(default = "1024 * 1024")]
    pub max_file_size: u64,

    /// Characters of context on each side of a content hit.
    #[builder(default = "60")]
    pub context_chars: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            filters: SearchFilters::default(),
            max_depth: 10,
            max_results: 500,
            max_file_size: 1024 * 1024,
            context_chars: 60,
        }
    }
}

impl SearchOptions {
    /// Create a new options builder.
    pub fn builder() -> SearchOptionsBuilder {
        SearchOptionsBuilder::default()
    }

    /// Defaults taken from the engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            filters: SearchFilters::default(),
            max_depth: config.default_max_depth,
            max_results: config.default_max_results,
            max_file_size: config.max_content_file_size,
            context_chars: config.context_chars,
        }
    }
}
