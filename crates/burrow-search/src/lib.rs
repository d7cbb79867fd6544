//! Search for burrow.
//!
//! Every mode is a case-insensitive substring match on a lowercase query:
//!
//! - **Live name search** walks a subtree and matches entry names
//! - **Live content search** walks a subtree and scans text files line by line
//! - **List content search** scans a caller-supplied list of files
//! - **Index-backed search** matches names or contents of the entries stored
//!   by the [`IndexStore`]
//!
//! Content hits carry one excerpt per file, with up to `context_chars`
//! characters on each side of the match.
//!
//! ```rust,no_run
//! use burrow_core::{ExclusionPolicy, Operation};
//! use burrow_search::{Query, SearchOptions, search_content};
//!
//! let query = Query::new("todo").unwrap();
//! let hits = search_content(
//!     "/path/to/project".as_ref(),
//!     &query,
//!     &SearchOptions::default(),
//!     &ExclusionPolicy::new(),
//!     &Operation::detached(),
//! )
//! .unwrap();
//!
//! for hit in hits {
//!     println!("{}:{:?} {:?}", hit.path.display(), hit.match_line_number, hit.match_context);
//! }
//! ```

mod indexed;
mod list;
mod live;
mod matcher;
mod options;
mod store;

pub use indexed::{search_content_index, search_index};
pub use list::search_content_list;
pub use live::{match_content, search_content, search_files};
pub use matcher::{ContentMatch, Query, excerpt, find_in_file, is_text_file, rank_by_name};
pub use options::{SearchOptions, SearchOptionsBuilder};
pub use store::{INDEX_FORMAT_VERSION, IndexSnapshot, IndexStore, PersistedIndex};
