//! Progress events and throttled reporting.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The kind of task a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TaskKind {
    BuildIndex,
    SearchFiles,
    SearchContent,
    SearchContentList,
    SearchContentIndex,
    SearchIndex,
    FolderSize,
    Checksum,
    ListDirectory,
    LoadIndex,
    SaveIndex,
}

/// Task-specific progress payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressData {
    /// Tree walks (index build, folder size).
    #[serde(rename_all = "camelCase")]
    Walk {
        calculated_size: u64,
        file_count: u64,
        folder_count: u64,
        current_path: PathBuf,
    },
    /// Checksum streaming.
    Checksum { percent: f64, algorithm: String },
    /// Directory listing.
    Listing { loaded: u64 },
}

/// A progress update tied to an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub task: TaskKind,
    pub operation_id: Option<String>,
    pub data: ProgressData,
}

/// Destination for progress payloads.
///
/// Delivery is best-effort; sinks may drop updates.
pub trait ProgressSink: Send + Sync {
    fn send(&self, data: ProgressData);
}

/// Sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn send(&self, _data: ProgressData) {}
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressData) + Send + Sync,
{
    fn send(&self, data: ProgressData) {
        self(data)
    }
}

/// Rate limiter allowing at most one event per interval.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    /// Create a throttle with the given minimum spacing.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether an event may be emitted now; records the emission if so.
    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    /// Like [`ready`](Self::ready) with an explicit clock reading.
    pub fn ready_at(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Throttled front end over a [`ProgressSink`].
pub struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    throttle: Throttle,
}

impl<'a> ProgressReporter<'a> {
    /// Create a reporter emitting at most once per `interval`.
    pub fn new(sink: &'a dyn ProgressSink, interval: Duration) -> Self {
        Self {
            sink,
            throttle: Throttle::new(interval),
        }
    }

    /// Emit if the throttle allows; the payload is only built when it does.
    pub fn report(&mut self, data: impl FnOnce() -> ProgressData) {
        if self.throttle.ready() {
            self.sink.send(data());
        }
    }

    /// Emit unconditionally.
    pub fn force(&mut self, data: ProgressData) {
        self.throttle.last = Some(Instant::now());
        self.sink.send(data);
    }
}
