use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;
use uuid::Uuid;

use chime_core::Task;

use crate::error::{Result, StoreError};
use crate::recurrence;
use crate::types::{NewSchedule, Recurrence, Schedule};

/// Persistence seam consumed by the dispatcher.
///
/// Only the two operations the check cycle needs; management of schedule
/// records (add/get/list/remove) lives on the concrete store.
pub trait ScheduleStore: Send + Sync {
    /// All schedules with `next_fire <= now`.
    fn find_due(&self, now: DateTime<Utc>) -> std::result::Result<Vec<Schedule>, StoreError>;

    /// Persist every mutable field of `schedule`. Idempotent on retry.
    fn update(&self, schedule: &Schedule) -> std::result::Result<(), StoreError>;
}

/// Initialise the schedule schema in `conn`.
///
/// Creates the `schedules` table (idempotent) and an index on `next_fire` so
/// the due scan stays efficient with thousands of schedules.
pub fn init_schema(conn: &Connection) -> std::result::Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schedules (
            id          TEXT NOT NULL PRIMARY KEY,
            name        TEXT NOT NULL,
            recurrence  TEXT NOT NULL,   -- JSON-encoded Recurrence enum
            queue       TEXT NOT NULL,
            task        TEXT NOT NULL,   -- opaque JSON payload
            next_fire   TEXT NOT NULL,   -- RFC-3339 UTC
            last_fire   TEXT,            -- RFC-3339 UTC or NULL
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        ) STRICT;

        -- Efficient due scan: SELECT … WHERE next_fire <= ?  ORDER BY next_fire
        CREATE INDEX IF NOT EXISTS idx_schedules_next_fire ON schedules (next_fire);
        ",
    )?;
    Ok(())
}

/// SQLite-backed schedule store.
///
/// Timestamps are stored as RFC-3339 UTC text in a fixed format, so the due
/// query is a plain string `<=` over the indexed `next_fire` column.
pub struct SqliteScheduleStore {
    conn: Mutex<Connection>,
}

impl SqliteScheduleStore {
    /// Wrap `conn`, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a new schedule. Returns the fully populated record.
    ///
    /// The recurrence is validated here so a bad definition fails at
    /// registration time instead of poisoning every later check cycle.
    pub fn add(&self, new: NewSchedule) -> Result<Schedule> {
        recurrence::validate(&new.recurrence)?;

        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let rec_json = encode(&id, "recurrence", &new.recurrence)?;
        let task_json = encode(&id, "task", &new.task)?;

        conn.execute(
            "INSERT INTO schedules
             (id, name, recurrence, queue, task, next_fire, last_fire, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,NULL,?7,?7)",
            params![
                id,
                new.name,
                rec_json,
                new.queue,
                task_json,
                fmt_ts(new.next_fire),
                fmt_ts(now)
            ],
        )
        .map_err(StoreError::from)?;
        info!(schedule_id = %id, name = %new.name, next_fire = %new.next_fire, "schedule added");

        Ok(Schedule {
            id,
            name: new.name,
            recurrence: new.recurrence,
            queue: new.queue,
            task: new.task,
            next_fire: new.next_fire,
            last_fire: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Fetch one schedule by ID.
    pub fn get(&self, id: &str) -> Result<Schedule> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                "SELECT id, name, recurrence, queue, task, next_fire, last_fire,
                        created_at, updated_at
                 FROM schedules WHERE id = ?1",
                [id],
                raw_row,
            )
            .optional()
            .map_err(StoreError::from)?;
        match raw {
            Some(raw) => Ok(decode(raw)?),
            None => Err(StoreError::NotFound { id: id.to_string() }.into()),
        }
    }

    /// Return all schedules ordered by creation time.
    pub fn list(&self) -> Result<Vec<Schedule>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, recurrence, queue, task, next_fire, last_fire,
                        created_at, updated_at
                 FROM schedules ORDER BY created_at",
            )
            .map_err(StoreError::from)?;
        let raws = stmt
            .query_map([], raw_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(StoreError::from)?;
        raws.into_iter()
            .map(|raw| decode(raw).map_err(Into::into))
            .collect()
    }

    /// Delete a schedule by ID. `NotFound` if no row is deleted.
    pub fn remove(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn
            .execute("DELETE FROM schedules WHERE id = ?1", [id])
            .map_err(StoreError::from)?;
        if n == 0 {
            return Err(StoreError::NotFound { id: id.to_string() }.into());
        }
        info!(schedule_id = %id, "schedule removed");
        Ok(())
    }
}

impl ScheduleStore for SqliteScheduleStore {
    fn find_due(&self, now: DateTime<Utc>) -> std::result::Result<Vec<Schedule>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, recurrence, queue, task, next_fire, last_fire,
                    created_at, updated_at
             FROM schedules WHERE next_fire <= ?1 ORDER BY next_fire",
        )?;
        let raws = stmt
            .query_map([fmt_ts(now)], raw_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(decode).collect()
    }

    fn update(&self, schedule: &Schedule) -> std::result::Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let rec_json = encode(&schedule.id, "recurrence", &schedule.recurrence)?;
        let task_json = encode(&schedule.id, "task", &schedule.task)?;
        let n = conn.execute(
            "UPDATE schedules SET name=?1, recurrence=?2, queue=?3, task=?4,
              next_fire=?5, last_fire=?6, updated_at=?7
             WHERE id=?8",
            params![
                schedule.name,
                rec_json,
                schedule.queue,
                task_json,
                fmt_ts(schedule.next_fire),
                schedule.last_fire.map(fmt_ts),
                fmt_ts(Utc::now()),
                schedule.id
            ],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound {
                id: schedule.id.clone(),
            });
        }
        Ok(())
    }
}

// --- row plumbing ----------------------------------------------------------

// Column order of every SELECT above.
type RawRow = (
    String,         // id
    String,         // name
    String,         // recurrence JSON
    String,         // queue
    String,         // task JSON
    String,         // next_fire
    Option<String>, // last_fire
    String,         // created_at
    String,         // updated_at
);

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

/// Decode a raw row into a [`Schedule`]; failure is a corrupt record, not a
/// row to skip. A silently dropped schedule would sit due forever without
/// anyone noticing.
fn decode(raw: RawRow) -> std::result::Result<Schedule, StoreError> {
    let (id, name, rec_json, queue, task_json, next_fire, last_fire, created_at, updated_at) = raw;
    let recurrence: Recurrence = serde_json::from_str(&rec_json)
        .map_err(|e| corrupt(&id, format!("recurrence: {e}")))?;
    let task: Task =
        serde_json::from_str(&task_json).map_err(|e| corrupt(&id, format!("task: {e}")))?;
    let next_fire = parse_ts(&id, "next_fire", &next_fire)?;
    let last_fire = match last_fire {
        Some(raw) => Some(parse_ts(&id, "last_fire", &raw)?),
        None => None,
    };
    let created_at = parse_ts(&id, "created_at", &created_at)?;
    let updated_at = parse_ts(&id, "updated_at", &updated_at)?;
    Ok(Schedule {
        id,
        name,
        recurrence,
        queue,
        task,
        next_fire,
        last_fire,
        created_at,
        updated_at,
    })
}

fn encode<T: serde::Serialize>(
    id: &str,
    column: &str,
    value: &T,
) -> std::result::Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| corrupt(id, format!("{column}: {e}")))
}

fn corrupt(id: &str, detail: String) -> StoreError {
    StoreError::Corrupt {
        id: id.to_string(),
        detail,
    }
}

/// Fixed RFC-3339 UTC rendering ("2024-03-01T09:00:00Z"). Every timestamp
/// written through here, so lexicographic SQL comparison matches the
/// chronological order.
fn fmt_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_ts(id: &str, column: &str, raw: &str) -> std::result::Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(id, format!("{column}: {e}")))
}
