//! Colombian-timezone (America/Bogota, UTC-5) clock.
//!
//! All date/time decisions in the application go through an injected
//! [`Clock`] instead of raw `Utc::now()`, so they are consistent regardless
//! of the host's system timezone and can be pinned in tests. Colombia does
//! not observe daylight saving time, so a fixed UTC-5 offset is always
//! correct.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Utc};

const BOGOTA_OFFSET_HOURS: i64 = -5;

/// Spanish three-letter day labels, keyed from Sunday.
const DAY_MAP: [&str; 7] = ["DOM", "LUN", "MAR", "MIE", "JUE", "VIE", "SAB"];

pub trait Clock: Send + Sync {
    /// Current Colombian wall-clock time as a naive datetime.
    fn now(&self) -> NaiveDateTime;

    /// Today's civil date in Colombia.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Production clock: the system instant shifted to UTC-5.
pub struct BogotaClock;

impl Clock for BogotaClock {
    fn now(&self) -> NaiveDateTime {
        (Utc::now() + Duration::hours(BOGOTA_OFFSET_HOURS)).naive_utc()
    }
}

/// Test clock pinned to a single instant.
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Civil-date comparison: strictly before today.
pub fn is_past(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

/// Cutoff rule: changes are only allowed for dates strictly after today.
pub fn is_tomorrow_or_later(date: NaiveDate, today: NaiveDate) -> bool {
    date > today
}

pub fn day_of_week(date: NaiveDate) -> &'static str {
    DAY_MAP[date.weekday().num_days_from_sunday() as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn day_of_week_is_keyed_from_sunday() {
        assert_eq!(day_of_week(d("2026-03-08")), "DOM");
        assert_eq!(day_of_week(d("2026-03-09")), "LUN");
        assert_eq!(day_of_week(d("2026-03-10")), "MAR");
        assert_eq!(day_of_week(d("2026-03-14")), "SAB");
    }

    #[test]
    fn cutoff_comparisons_are_strict() {
        let today = d("2026-03-05");
        assert!(is_past(d("2026-03-04"), today));
        assert!(!is_past(today, today));
        assert!(!is_tomorrow_or_later(today, today));
        assert!(is_tomorrow_or_later(d("2026-03-06"), today));
    }

    #[test]
    fn fixed_clock_pins_today() {
        let clock = FixedClock(d("2026-03-05").and_hms_opt(22, 30, 0).unwrap());
        assert_eq!(clock.today(), d("2026-03-05"));
    }
}
