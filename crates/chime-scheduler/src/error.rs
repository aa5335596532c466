use thiserror::Error;

/// Errors raised by [`crate::store::ScheduleStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A schedule could not be encoded for storage, or a persisted row could
    /// not be decoded back.
    #[error("Corrupt schedule record {id}: {detail}")]
    Corrupt { id: String, detail: String },

    /// No schedule with the given ID exists in the store.
    #[error("Schedule not found: {id}")]
    NotFound { id: String },
}

/// Errors raised by [`crate::queue::WorkQueue`] implementations.
///
/// Only [`QueueError::Unavailable`] is transient: the dispatcher logs it and
/// leaves the schedule due for the next cycle. Every other variant propagates.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue cannot accept work right now; retry next cycle.
    #[error("Work queue unavailable: {0}")]
    Unavailable(String),

    /// The queue is permanently gone (e.g. its consumer has shut down).
    #[error("Work queue closed: {0}")]
    Closed(String),

    /// The queue refused this particular task (bad payload, oversize, ...).
    #[error("Work queue rejected task: {0}")]
    Rejected(String),
}

impl QueueError {
    /// Whether the failure is the retry-eligible "queue unavailable" condition.
    pub fn is_transient(&self) -> bool {
        matches!(self, QueueError::Unavailable(_))
    }
}

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Non-transient queue failure; transient ones never reach callers.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The recurrence fields cannot produce a valid calendar date.
    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
