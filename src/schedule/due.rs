//! Due-date predicate for stops.

use chrono::{Duration, NaiveDate};

use crate::domain::cadence::{Cadence, WeekBucket};
use crate::domain::stop::Stop;
use crate::domain::weekday::DayOfWeek;
use crate::error::{Result, RoutebookError};
use crate::schedule::calendar::resolve_week_bucket;
use crate::sequence::Membership;

/// Validated cadence of a stop or route entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Weekly,
    Biweekly(WeekBucket),
}

impl Schedule {
    /// Check a raw cadence / week-bucket pair.
    ///
    /// Weekly must have no bucket; biweekly must have bucket A or B.
    pub fn from_parts(cadence: &Cadence, bucket: Option<&WeekBucket>) -> Result<Self> {
        match (cadence, bucket) {
            (Cadence::Weekly, None) => Ok(Schedule::Weekly),
            (Cadence::Weekly, Some(bucket)) => Err(RoutebookError::InvalidScheduleConfiguration(format!(
                "weekly cadence must not have a week bucket (found '{}')",
                bucket
            ))),
            (Cadence::Biweekly, Some(bucket @ (WeekBucket::A | WeekBucket::B))) => {
                Ok(Schedule::Biweekly(bucket.clone()))
            }
            (Cadence::Biweekly, Some(bucket)) => Err(RoutebookError::InvalidScheduleConfiguration(format!(
                "unrecognized week bucket '{}'",
                bucket
            ))),
            (Cadence::Biweekly, None) => Err(RoutebookError::InvalidScheduleConfiguration(
                "biweekly cadence requires week bucket A or B".to_string(),
            )),
            (Cadence::Unrecognized(raw), _) => Err(RoutebookError::InvalidScheduleConfiguration(format!(
                "unrecognized cadence '{}'",
                raw
            ))),
        }
    }

    /// Schedule that applies to `stop` when it is visited through a route
    /// entry with the given membership.
    pub fn for_membership(membership: &Membership, stop: &Stop) -> Result<Self> {
        match membership {
            Membership::Simple => stop.schedule(),
            Membership::WithCadence { cadence, week_bucket } => Self::from_parts(cadence, week_bucket.as_ref()),
        }
    }

    pub fn into_parts(self) -> (Cadence, Option<WeekBucket>) {
        match self {
            Schedule::Weekly => (Cadence::Weekly, None),
            Schedule::Biweekly(bucket) => (Cadence::Biweekly, Some(bucket)),
        }
    }
}

/// Whether `stop` needs a visit on `date`, using its own schedule.
///
/// An invalid schedule is an error regardless of the date.
pub fn is_due_on(stop: &Stop, date: NaiveDate) -> Result<bool> {
    let schedule = stop.schedule()?;
    Ok(is_due_with(stop, &schedule, date))
}

/// Due check with an already-resolved schedule (e.g. a route override).
pub fn is_due_with(stop: &Stop, schedule: &Schedule, date: NaiveDate) -> bool {
    if !stop.serves_on(DayOfWeek::of(date)) {
        return false;
    }
    if date < stop.start_date {
        return false;
    }
    match schedule {
        Schedule::Weekly => true,
        Schedule::Biweekly(bucket) => resolve_week_bucket(stop.start_date, date) == *bucket,
    }
}

/// First date on or after `from` (and not before the stop's start date) on
/// which the stop is due. `None` when the stop has no service days.
pub fn next_due_on_or_after(stop: &Stop, from: NaiveDate) -> Result<Option<NaiveDate>> {
    let schedule = stop.schedule()?;
    let first = from.max(stop.start_date);
    // Every pattern repeats within one full two-week cycle
    Ok((0..14)
        .map(|offset| first + Duration::days(offset))
        .find(|date| is_due_with(stop, &schedule, *date)))
}
