//! Engine configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::exclude::ExclusionPolicy;

/// Tunables for every task the engine runs.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of entries an index build collects.
    #[builder(default = "200_000")]
    pub max_index_size: usize,

    /// Default locations for index builds.
    #[builder(default = "default_index_locations()")]
    pub index_locations: Vec<PathBuf>,

    /// Default persisted index location.
    #[builder(default = "default_index_path()")]
    pub index_path: PathBuf,

    /// Files stat'ed together during folder-size walks.
    #[builder(default = "50")]
    pub folder_size_batch: usize,

    /// Entries resolved together during directory listing.
    #[builder(default = "100")]
    pub listing_batch: usize,

    /// Minimum spacing between progress events, in milliseconds.
    #[builder(default = "100")]
    pub progress_interval_ms: u64,

    /// Largest file opened by content search.
    #[builder(default = "1024 * 1024")]
    pub max_content_file_size: u64,

    /// Characters of context kept on each side of a content match.
    #[builder(default = "60")]
    pub context_chars: usize,

    /// Default depth limit for live searches.
    #[builder(default = "10")]
    pub default_max_depth: usize,

    /// Default result cap for searches.
    #[builder(default = "500")]
    pub default_max_results: usize,

    /// Maximum hidden-attribute cache entries.
    #[builder(default = "10_000")]
    pub hidden_cache_capacity: usize,

    /// Hidden-attribute cache time-to-live, in seconds.
    #[builder(default = "300")]
    pub hidden_cache_ttl_secs: u64,

    /// Timeout for external attribute-query processes, in milliseconds.
    #[builder(default = "2000")]
    pub attribute_query_timeout_ms: u64,

    /// Extra glob patterns excluded from index builds and searches.
    #[builder(default)]
    pub extra_exclude_patterns: Vec<String>,

    /// Worker count (0 = auto).
    #[builder(default = "0")]
    pub workers: usize,
}

fn default_index_locations() -> Vec<PathBuf> {
    dirs::home_dir().into_iter().collect()
}

fn default_index_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("burrow")
        .join("index.json")
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_index_size == Some(0) {
            return Err("max_index_size must be positive".to_string());
        }
        if self.folder_size_batch == Some(0) || self.listing_batch == Some(0) {
            return Err("batch sizes must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_index_size: 200_000,
            index_locations: default_index_locations(),
            index_path: default_index_path(),
            folder_size_batch: 50,
            listing_batch: 100,
            progress_interval_ms: 100,
            max_content_file_size: 1024 * 1024,
            context_chars: 60,
            default_max_depth: 10,
            default_max_results: 500,
            hidden_cache_capacity: 10_000,
            hidden_cache_ttl_secs: 300,
            attribute_query_timeout_ms: 2000,
            extra_exclude_patterns: Vec::new(),
            workers: 0,
        }
    }
}

impl EngineConfig {
    /// Create a new config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("burrow")
            .join("config.toml")
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(EngineError::io(path, e)),
        };

        let config: Self = toml::from_str(&text)
            .map_err(|e| EngineError::invalid(format!("{}: {e}", path.display())))?;
        config.check()?;
        Ok(config)
    }

    /// Validate a config that did not come through the builder.
    pub fn check(&self) -> EngineResult<()> {
        if self.max_index_size == 0 {
            return Err(EngineError::invalid("max_index_size must be positive"));
        }
        if self.folder_size_batch == 0 || self.listing_batch == 0 {
            return Err(EngineError::invalid("batch sizes must be positive"));
        }
        Ok(())
    }

    /// Progress throttle window.
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Hidden-attribute cache TTL.
    pub fn hidden_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.hidden_cache_ttl_secs)
    }

    /// Attribute-query subprocess timeout.
    pub fn attribute_query_timeout(&self) -> Duration {
        Duration::from_millis(self.attribute_query_timeout_ms)
    }

    /// Build the exclusion policy including user patterns.
    pub fn exclusion_policy(&self) -> EngineResult<ExclusionPolicy> {
        ExclusionPolicy::with_patterns(&self.extra_exclude_patterns)
    }

    /// Effective worker count.
    pub fn worker_count(&self) -> usize {
        match self.workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get().min(4))
                .unwrap_or(2),
            n => n,
        }
    }
}
