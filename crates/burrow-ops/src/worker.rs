//! Async worker pool and the controller message protocol.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use burrow_core::{ProgressData, ProgressEvent, ProgressSink, TaskKind};

use crate::dispatcher::Dispatcher;
use crate::task::{TaskRequest, TaskResult};

/// Buffer size for the request queue and the outgoing message channel.
pub const WORKER_CHANNEL_SIZE: usize = 100;

/// Message sent from the pool to the controller.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkerMessage {
    Progress(ProgressEvent),
    Result(TaskResult),
}

/// Message sent from the controller to the pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlMessage {
    Task(TaskRequest),
    #[serde(rename_all = "camelCase")]
    Cancel { operation_id: String },
}

impl WorkerMessage {
    /// Encode as one newline-terminated JSON line.
    ///
    /// A result that cannot be encoded is replaced by a failure result with
    /// the same ID, so every request still gets an answer. Progress that
    /// cannot be encoded is dropped.
    pub fn to_json_line(&self) -> Option<Vec<u8>> {
        let encoded = match serde_json::to_vec(self) {
            Ok(line) => Some(line),
            Err(err) => match self {
                Self::Progress(_) => {
                    tracing::debug!(error = %err, "dropping unencodable progress");
                    None
                }
                Self::Result(result) => {
                    tracing::warn!(id = %result.id, error = %err, "result could not be encoded");
                    let fallback = TaskResult::failure(
                        result.id.clone(),
                        format!("failed to encode result: {err}"),
                    );
                    serde_json::to_vec(&Self::Result(fallback)).ok()
                }
            },
        };
        encoded.map(|mut line| {
            line.push(b'\n');
            line
        })
    }
}

/// Forwards progress for one request onto the outgoing channel.
///
/// Progress is lossy: when the channel is full the update is dropped
/// rather than stalling the task.
struct ChannelSink {
    tx: mpsc::Sender<WorkerMessage>,
    task: TaskKind,
    operation_id: Option<String>,
}

impl ProgressSink for ChannelSink {
    fn send(&self, data: ProgressData) {
        let event = ProgressEvent {
            task: self.task,
            operation_id: self.operation_id.clone(),
            data,
        };
        let _ = self.tx.try_send(WorkerMessage::Progress(event));
    }
}

/// A fixed set of async workers sharing one request queue.
///
/// Each request runs on the blocking thread pool. Results and progress
/// arrive on the receiver returned by [`WorkerPool::start`].
pub struct WorkerPool {
    dispatcher: Arc<Dispatcher>,
    tasks: Option<mpsc::Sender<TaskRequest>>,
    shutdown: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one) on the current runtime.
    pub fn start(
        dispatcher: Arc<Dispatcher>,
        size: usize,
    ) -> (Self, mpsc::Receiver<WorkerMessage>) {
        let (task_tx, task_rx) = mpsc::channel(WORKER_CHANNEL_SIZE);
        let (out_tx, out_rx) = mpsc::channel(WORKER_CHANNEL_SIZE);
        let shutdown = CancellationToken::new();
        let queue = Arc::new(Mutex::new(task_rx));

        let size = size.max(1);
        let workers = (0..size)
            .map(|index| {
                tokio::spawn(run_worker(
                    index,
                    Arc::clone(&dispatcher),
                    Arc::clone(&queue),
                    out_tx.clone(),
                    shutdown.clone(),
                ))
            })
            .collect();
        tracing::debug!(workers = size, "worker pool started");

        (
            Self {
                dispatcher,
                tasks: Some(task_tx),
                shutdown,
                workers,
            },
            out_rx,
        )
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Queue a request. Fails only once the pool is closed.
    pub async fn submit(&self, request: TaskRequest) -> Result<(), TaskRequest> {
        match &self.tasks {
            Some(tx) => tx.send(request).await.map_err(|e| e.0),
            None => Err(request),
        }
    }

    /// Route a controller message: tasks are queued, cancels applied.
    pub async fn handle_control(&self, message: ControlMessage) -> Result<(), TaskRequest> {
        match message {
            ControlMessage::Task(request) => self.submit(request).await,
            ControlMessage::Cancel { operation_id } => {
                self.cancel(&operation_id);
                Ok(())
            }
        }
    }

    /// Cancel an operation, whether running, queued or not yet submitted.
    ///
    /// Bypasses the request queue: the registry is marked before this
    /// returns, so a request submitted afterwards observes the cancel.
    pub fn cancel(&self, operation_id: &str) {
        self.dispatcher.cancel(operation_id);
    }

    /// Stop accepting requests, finish everything queued, then stop.
    pub async fn close(mut self) {
        self.tasks.take();
        self.join().await;
    }

    /// Stop after the requests currently running. Queued requests are
    /// dropped without a result.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        self.tasks.take();
        self.join().await;
    }

    async fn join(&mut self) {
        for handle in self.workers.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "worker exited abnormally");
            }
        }
        tracing::debug!("worker pool stopped");
    }
}

async fn run_worker(
    index: usize,
    dispatcher: Arc<Dispatcher>,
    queue: Arc<Mutex<mpsc::Receiver<TaskRequest>>>,
    out: mpsc::Sender<WorkerMessage>,
    shutdown: CancellationToken,
) {
    loop {
        let request = {
            let mut queue = queue.lock().await;
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = queue.recv() => match next {
                    Some(request) => request,
                    None => break,
                },
            }
        };

        let id = request.id.clone();
        let sink = ChannelSink {
            tx: out.clone(),
            task: request.task.kind(),
            operation_id: request.operation_id.clone(),
        };
        let task_dispatcher = Arc::clone(&dispatcher);
        let result = tokio::task::spawn_blocking(move || task_dispatcher.handle(request, &sink))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(worker = index, id = %id, error = %e, "task panicked");
                TaskResult::failure(id, format!("task failed: {e}"))
            });

        if out.send(WorkerMessage::Result(result)).await.is_err() {
            tracing::debug!(worker = index, "result receiver dropped");
            break;
        }
    }
}
