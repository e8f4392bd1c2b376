//! Time utilities and the injectable clock.
//!
//! All temporal logic in the engine reads time through the [`Clock`] trait so
//! that the publish loop, the activity loop, and the risk assessor can be
//! driven deterministically in tests with a [`ManualClock`].

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
use std::sync::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually-advanced clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at the given instant.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to a specific instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock lock") = now;
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

/// Midnight at the start of the given instant's UTC day.
pub fn start_of_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(
        &dt.date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid"),
    )
}

/// Midnight on the Monday of the given instant's week.
///
/// Weeks start on Monday; a Sunday timestamp maps back to the preceding
/// Monday rather than forward.
pub fn monday_of_week(dt: DateTime<Utc>) -> DateTime<Utc> {
    let days_back = dt.weekday().num_days_from_monday() as i64;
    start_of_day(dt) - Duration::days(days_back)
}

/// Weekday for a Monday-based day offset (0 = Monday .. 6 = Sunday).
pub fn weekday_from_monday_offset(offset: u32) -> Weekday {
    match offset % 7 {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

/// Parse a preferred posting time such as `"09:00"` or `"17:30"`.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}
