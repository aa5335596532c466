use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::error::Result;
use crate::queue::{QueuedTask, WorkQueue};
use crate::recurrence;
use crate::store::ScheduleStore;
use crate::types::Schedule;

/// Outcome counts for one check cycle. Informational: hosts may log or
/// inspect it, nothing downstream consumes it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CycleReport {
    /// Schedules found due this cycle.
    pub due: usize,
    /// Enqueued and advanced.
    pub dispatched: usize,
    /// Left due because the queue was transiently unavailable.
    pub deferred: usize,
    /// Non-transient per-schedule failures: (schedule id, error).
    pub failed: Vec<(String, String)>,
}

enum DispatchOutcome {
    Dispatched,
    Deferred,
}

/// Finds due schedules, pushes their tasks into the work queue and advances
/// their `next_fire`, one cycle at a time.
pub struct Dispatcher {
    store: Arc<dyn ScheduleStore>,
    queue: Arc<dyn WorkQueue>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        queue: Arc<dyn WorkQueue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            queue,
            clock,
        }
    }

    /// Run one full check cycle: scan for due schedules, attempt each once.
    ///
    /// A failed due scan aborts the cycle. Per-schedule failures do not: a
    /// transient queue outage defers the schedule (logged at debug, retried
    /// next cycle), anything else is logged at error and recorded in the
    /// report while the remaining schedules are still processed.
    pub fn run_cycle(&self) -> Result<CycleReport> {
        let now = self.clock.now();
        let due = self.store.find_due(now)?;
        let mut report = CycleReport {
            due: due.len(),
            ..CycleReport::default()
        };

        for schedule in due {
            match self.dispatch_one(&schedule, now) {
                Ok(DispatchOutcome::Dispatched) => report.dispatched += 1,
                Ok(DispatchOutcome::Deferred) => report.deferred += 1,
                Err(err) => {
                    error!(schedule_id = %schedule.id, task = %schedule.task, "dispatch failed: {err}");
                    report.failed.push((schedule.id.clone(), err.to_string()));
                }
            }
        }

        info!(
            due = report.due,
            dispatched = report.dispatched,
            deferred = report.deferred,
            failed = report.failed.len(),
            "check cycle complete"
        );
        Ok(report)
    }

    fn dispatch_one(&self, schedule: &Schedule, now: DateTime<Utc>) -> Result<DispatchOutcome> {
        // Computed before the queue is touched: a recurrence that cannot
        // advance must not deliver work.
        let next_fire = recurrence::next_occurrence(&schedule.recurrence, now)?;

        let item = QueuedTask {
            queue: schedule.queue.clone(),
            schedule_id: schedule.id.clone(),
            task: schedule.task.clone(),
        };
        if let Err(err) = self.queue.enqueue(item) {
            if err.is_transient() {
                // Leave next_fire untouched: the schedule stays due and the
                // next cycle retries, so no occurrence is lost to an outage.
                debug!(
                    schedule_id = %schedule.id,
                    task = %schedule.task,
                    error = %err,
                    "work queue unavailable; dispatch deferred"
                );
                return Ok(DispatchOutcome::Deferred);
            }
            return Err(err.into());
        }

        // Enqueue before persist: a crash between the two re-delivers next
        // cycle instead of losing the occurrence.
        let mut advanced = schedule.clone();
        advanced.next_fire = next_fire;
        advanced.last_fire = Some(now);
        self.store.update(&advanced)?;

        info!(
            schedule_id = %schedule.id,
            task = %schedule.task,
            next_fire = %next_fire,
            "task dispatched"
        );
        Ok(DispatchOutcome::Dispatched)
    }

    /// Main driver loop. Runs a cycle every `cadence` until `shutdown`
    /// broadcasts `true`.
    ///
    /// Cycles run inline in this task, so they can never overlap; a cycle
    /// that overruns the interval delays the next tick rather than stacking.
    pub async fn run(self, cadence: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(cadence_secs = cadence.as_secs(), "dispatcher started");
        let mut interval = tokio::time::interval(cadence);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_cycle() {
                        error!("check cycle error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("dispatcher shutting down");
                        break;
                    }
                }
            }
        }
    }
}
