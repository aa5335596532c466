use chrono::{DateTime, Utc};

/// Source of the current instant.
///
/// The dispatcher reads time once per cycle through this seam so tests can
/// pin "now" to an exact value instead of racing the wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time in UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
