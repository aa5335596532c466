use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chime_core::Task;

/// Defines which calendar pattern a schedule fires on.
///
/// Each variant carries exactly the fields it needs; `hour` (0–23) and
/// `minute` (0–59) apply to every kind. The kind is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    /// Fire every day at HH:MM.
    Daily { hour: u8, minute: u8 },

    /// Fire on a specific weekday (0 = Monday … 6 = Sunday) at HH:MM.
    Weekly { weekday: u8, hour: u8, minute: u8 },

    /// Fire on a specific day of every month (1–31) at HH:MM. Days past the
    /// end of a month clamp to that month's last day.
    Monthly { day: u8, hour: u8, minute: u8 },

    /// Fire once a year on month/day (1–12, 1–31) at HH:MM. Feb 29 clamps to
    /// Feb 28 in non-leap years.
    Yearly {
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
    },
}

impl Recurrence {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Recurrence::Daily { .. } => "daily",
            Recurrence::Weekly { .. } => "weekly",
            Recurrence::Monthly { .. } => "monthly",
            Recurrence::Yearly { .. } => "yearly",
        }
    }
}

/// A persisted schedule record: a recurrence definition plus the task it
/// pushes into a work queue each time it fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    /// UUID v4 string, assigned by the store on insert.
    pub id: String,
    /// Human-readable label.
    pub name: String,
    /// When this schedule fires.
    pub recurrence: Recurrence,
    /// Destination queue for `task`.
    pub queue: String,
    /// Opaque payload handed to the queue verbatim on every fire.
    pub task: Task,
    /// Next due instant. Strictly in the future once computed, except in the
    /// window between becoming due and being successfully dispatched.
    pub next_fire: DateTime<Utc>,
    /// Reference time of the most recent successful dispatch, if any.
    pub last_fire: Option<DateTime<Utc>>,
    /// Set by the store on insert.
    pub created_at: DateTime<Utc>,
    /// Bumped by the store on every update.
    pub updated_at: DateTime<Utc>,
}

/// Insert shape for [`Schedule`]; the store assigns id and bookkeeping fields.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub name: String,
    pub recurrence: Recurrence,
    pub queue: String,
    pub task: Task,
    /// First due instant. Hosts usually seed this with
    /// [`crate::recurrence::next_occurrence`] at creation time.
    pub next_fire: DateTime<Utc>,
}
