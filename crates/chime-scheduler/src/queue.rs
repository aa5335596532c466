use chime_core::Task;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::QueueError;

/// A unit of work handed off to the queue, tagged with the queue it was
/// addressed to and the schedule that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedTask {
    pub queue: String,
    pub schedule_id: String,
    pub task: Task,
}

/// Destination for due work.
///
/// `Unavailable` is the one transient outcome: the dispatcher leaves the
/// schedule due and a later cycle retries it. `Closed` and `Rejected` are
/// hard failures for the schedule that hit them.
pub trait WorkQueue: Send + Sync {
    fn enqueue(&self, item: QueuedTask) -> Result<(), QueueError>;
}

/// In-process queue over a bounded channel.
///
/// `enqueue` never blocks: a full channel reports `Unavailable` so the
/// dispatch cycle keeps its pace instead of stalling behind a slow worker.
#[derive(Debug, Clone)]
pub struct ChannelWorkQueue {
    tx: mpsc::Sender<QueuedTask>,
}

impl ChannelWorkQueue {
    pub fn new(tx: mpsc::Sender<QueuedTask>) -> Self {
        Self { tx }
    }
}

impl WorkQueue for ChannelWorkQueue {
    fn enqueue(&self, item: QueuedTask) -> Result<(), QueueError> {
        self.tx.try_send(item).map_err(|err| match err {
            TrySendError::Full(_) => QueueError::Unavailable("channel is at capacity".into()),
            TrySendError::Closed(_) => QueueError::Closed("no worker is draining the channel".into()),
        })
    }
}
