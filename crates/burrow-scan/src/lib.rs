//! Tree walking for burrow.
//!
//! This crate owns every task that has to traverse the filesystem: the
//! explicit-stack [`TreeWalker`], batched stat helpers, the
//! [`HiddenResolver`], and the three walk consumers built on top of them.
//!
//! # Overview
//!
//! - **Index build** walks one or more locations with the exclusion policy
//!   applied and collects every file up to an entry cap.
//! - **Folder size** aggregates sizes, counts and a per-extension breakdown
//!   for a caller-chosen subtree.
//! - **Directory listing** lists one directory in batches, resolving hidden
//!   flags per batch.
//!
//! # Example
//!
//! ```rust,no_run
//! use burrow_core::{EngineConfig, NoProgress, Operation};
//! use burrow_scan::folder_size;
//!
//! let config = EngineConfig::default();
//! let report = folder_size("/path/to/dir".as_ref(), &config, &Operation::detached(), &NoProgress)
//!     .unwrap();
//!
//! println!("Total size: {} bytes", report.total_size);
//! println!("Total files: {}", report.file_count);
//! ```

mod folder_size;
mod hidden;
mod index_build;
mod listing;
mod progress;
mod stat;
mod walker;

pub use folder_size::{FileTypeStat, FolderSizeReport, folder_size};
pub use hidden::{
    AttributeStrategy, DotNameStrategy, HiddenCache, HiddenResolver, HiddenStrategy, is_dot_name,
};
pub use index_build::{IndexBuildReport, IndexBuilder};
pub use listing::{DirectoryListing, list_directory};
pub use progress::WalkTracker;
pub use stat::{stat_batch, stat_batched, stat_item};
pub use walker::{Flow, TreeWalker, WalkItem, WalkStats, WalkVisitor, ensure_directory, read_children};
