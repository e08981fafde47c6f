use std::sync::Mutex;

use chrono::{DateTime, Duration, DurationRound, TimeZone, Utc};

/// Source of resource timestamps.
///
/// Implementations must be safe to share across worker threads.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Truncate a timestamp to whole microseconds, the precision stored for
/// every resource time.
pub fn truncate_micros(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_trunc(Duration::microseconds(1)).unwrap_or(t)
}

/// Wall clock that never goes backwards.
///
/// Readings are truncated to microseconds. If the wall clock does not advance
/// past the previous reading, the previous reading plus one microsecond is
/// returned instead, so successive revisions always have distinct, ordered
/// creation times.
pub struct SystemClock {
    last_micros: Mutex<i64>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            last_micros: Mutex::new(i64::MIN),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_micros();
        let mut last = self.last_micros.lock().expect("clock mutex poisoned");
        let next = if wall > *last { wall } else { *last + 1 };
        *last = next;
        Utc.timestamp_micros(next).single().unwrap_or_else(Utc::now)
    }
}

/// Deterministic clock that advances by a fixed step on every reading.
pub struct ManualClock {
    state: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            state: Mutex::new(truncate_micros(start)),
            step,
        }
    }

    /// Starts at the Unix epoch and ticks one second per reading.
    pub fn epoch() -> Self {
        Self::new(DateTime::UNIX_EPOCH, Duration::seconds(1))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut state = self.state.lock().expect("clock mutex poisoned");
        *state += self.step;
        *state
    }
}
