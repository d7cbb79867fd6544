//! Core types and traits for burrow.
//!
//! This crate provides the data model shared by every engine task: entries,
//! errors, configuration, the cancellation registry, path exclusion rules,
//! search filters and progress reporting.

mod cancel;
mod config;
mod entry;
mod error;
mod exclude;
mod filter;
mod progress;

pub use cancel::{CancellationRegistry, Operation};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use entry::{Entry, epoch, extension_of, file_name_of};
pub use error::{EngineError, EngineResult};
pub use exclude::{ExclusionPolicy, should_exclude};
pub use filter::{FileTypeClass, SearchFilters, classify};
pub use progress::{
    NoProgress, ProgressData, ProgressEvent, ProgressReporter, ProgressSink, TaskKind, Throttle,
};
