//! `chime-scheduler` — recurring schedules with due-task dispatch.
//!
//! # Overview
//!
//! Schedule definitions are persisted to a SQLite `schedules` table. The
//! [`dispatcher::Dispatcher`] periodically scans for records whose
//! `next_fire` has arrived, pushes each one's task into its work queue and
//! persists the next occurrence. A transiently unavailable queue leaves the
//! schedule due, so the occurrence is retried on the following cycle instead
//! of being lost.
//!
//! # Recurrence variants
//!
//! | Variant   | Behaviour                                              |
//! |-----------|--------------------------------------------------------|
//! | `Daily`   | Fire at HH:MM UTC every day                            |
//! | `Weekly`  | Fire at HH:MM UTC on a specific weekday                |
//! | `Monthly` | Fire at HH:MM UTC on a day of the month (clamped)      |
//! | `Yearly`  | Fire at HH:MM UTC on a month/day of the year (clamped) |
//!
//! External collaborators enter through narrow traits ([`store::ScheduleStore`],
//! [`queue::WorkQueue`], [`clock::Clock`]), so hosts can swap persistence, queue
//! transport and time source without touching the dispatch logic.

pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod queue;
pub mod recurrence;
pub mod store;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use dispatcher::{CycleReport, Dispatcher};
pub use error::{QueueError, Result, SchedulerError, StoreError};
pub use queue::{ChannelWorkQueue, QueuedTask, WorkQueue};
pub use store::{init_schema, ScheduleStore, SqliteScheduleStore};
pub use types::{NewSchedule, Recurrence, Schedule};
