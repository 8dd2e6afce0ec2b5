//! Calendar dates and alternating-week parity.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::cadence::WeekBucket;

/// Week bucket `reference` falls in, counting whole weeks from `start`.
///
/// Weeks are floored toward negative infinity, so dates before `start`
/// keep alternating with the same phase instead of mirroring around it.
pub fn resolve_week_bucket(start: NaiveDate, reference: NaiveDate) -> WeekBucket {
    let weeks = (reference - start).num_days().div_euclid(7);
    if weeks.rem_euclid(2) == 0 {
        WeekBucket::A
    } else {
        WeekBucket::B
    }
}

/// The one time zone used to turn instants into calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceClock {
    #[default]
    Local,
    Utc,
}

impl ReferenceClock {
    /// Calendar date of an instant in this clock's zone.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            ReferenceClock::Local => instant.with_timezone(&Local).date_naive(),
            ReferenceClock::Utc => instant.date_naive(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_start_date_is_week_a() {
        let start = date(2024, 1, 1);
        assert_eq!(resolve_week_bucket(start, start), WeekBucket::A);
    }

    #[test]
    fn test_first_week_stays_a() {
        let start = date(2024, 1, 1);
        assert_eq!(resolve_week_bucket(start, date(2024, 1, 7)), WeekBucket::A);
        assert_eq!(resolve_week_bucket(start, date(2024, 1, 8)), WeekBucket::B);
        assert_eq!(resolve_week_bucket(start, date(2024, 1, 14)), WeekBucket::B);
        assert_eq!(resolve_week_bucket(start, date(2024, 1, 15)), WeekBucket::A);
    }

    #[test]
    fn test_dates_before_start_floor() {
        let start = date(2024, 1, 15);
        // One day before is week -1
        assert_eq!(resolve_week_bucket(start, date(2024, 1, 14)), WeekBucket::B);
        assert_eq!(resolve_week_bucket(start, date(2024, 1, 8)), WeekBucket::B);
        assert_eq!(resolve_week_bucket(start, date(2024, 1, 7)), WeekBucket::A);
        assert_eq!(resolve_week_bucket(start, date(2024, 1, 1)), WeekBucket::A);
    }

    #[test]
    fn test_fourteen_day_periodicity() {
        let start = date(2023, 11, 20);
        let mut reference = date(2023, 6, 1);
        for _ in 0..200 {
            assert_eq!(
                resolve_week_bucket(start, reference),
                resolve_week_bucket(start, reference + Duration::days(14))
            );
            reference += Duration::days(3);
        }
    }

    #[test]
    fn test_adjacent_weeks_differ() {
        let start = date(2024, 2, 29);
        let mut reference = date(2023, 12, 1);
        for _ in 0..200 {
            assert_ne!(
                resolve_week_bucket(start, reference),
                resolve_week_bucket(start, reference + Duration::days(7))
            );
            reference += Duration::days(1);
        }
    }

    #[test]
    fn test_utc_clock_ignores_time_of_day() {
        let early = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 1).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 8, 23, 59, 59).unwrap();
        assert_eq!(ReferenceClock::Utc.date_of(early), date(2024, 1, 8));
        assert_eq!(ReferenceClock::Utc.date_of(late), date(2024, 1, 8));
    }

    #[test]
    fn test_clock_serde_names() {
        let clock: ReferenceClock = serde_json::from_str("\"utc\"").unwrap();
        assert_eq!(clock, ReferenceClock::Utc);
        assert_eq!(ReferenceClock::default(), ReferenceClock::Local);
    }
}
