//! Task execution for burrow.
//!
//! This crate ties the scanning and search layers together: the checksum
//! engine, the task protocol types, the [`Dispatcher`] that routes a request
//! to its component, and an async [`WorkerPool`] that streams progress and
//! results back over channels.
//!
//! # Example
//!
//! ```no_run
//! use burrow_core::{EngineConfig, NoProgress};
//! use burrow_ops::{Dispatcher, Task, TaskRequest};
//!
//! let dispatcher = Dispatcher::new(EngineConfig::default()).unwrap();
//! let request = TaskRequest::new(
//!     "1",
//!     Task::FolderSize { folder_path: "/tmp".into() },
//! );
//! let result = dispatcher.handle(request, &NoProgress);
//! assert!(result.success);
//! ```

mod checksum;
mod dispatcher;
mod task;
mod worker;

pub use checksum::{ChecksumAlgorithm, checksum, parse_algorithms};
pub use dispatcher::Dispatcher;
pub use task::{SaveAck, Task, TaskOutput, TaskRequest, TaskResult};
pub use worker::{ControlMessage, WORKER_CHANNEL_SIZE, WorkerMessage, WorkerPool};
