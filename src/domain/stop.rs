//! Stop record and related types
//!
//! A Stop is a physical location a driver services. The scheduling engine only
//! reads stops; they are created and edited by an administrator.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::cadence::{Cadence, WeekBucket};
use crate::domain::weekday::DayOfWeek;
use crate::error::{Result, RoutebookError};
use crate::id::{generate_stop_id, now_ms};
use crate::schedule::Schedule;

/// Equipment category present at a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Machine {
    Soda,
    Snack,
    Frozen,
    Combo,
    Coffee,
}

impl Machine {
    pub const ALL: [Machine; 5] = [
        Machine::Soda,
        Machine::Snack,
        Machine::Frozen,
        Machine::Combo,
        Machine::Coffee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Machine::Soda => "soda",
            Machine::Snack => "snack",
            Machine::Frozen => "frozen",
            Machine::Combo => "combo",
            Machine::Coffee => "coffee",
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Machine {
    type Err = RoutebookError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        Machine::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| RoutebookError::InvalidInput(format!("unknown machine type: {}", s)))
    }
}

/// A serviced location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    //=== Identity ===
    pub id: String,
    pub name: String,
    pub address: Option<String>,

    /// Driver the stop is assigned to
    pub driver_id: String,

    //=== Schedule ===
    /// Weekdays on which the stop may be serviced
    pub days_of_week: Vec<DayOfWeek>,

    #[serde(alias = "frequency")]
    pub cadence: Cadence,

    /// Required for biweekly stops, absent for weekly ones
    #[serde(alias = "week_type", default)]
    pub week_bucket: Option<WeekBucket>,

    /// Anchor for the cadence; nothing is due before it
    pub start_date: NaiveDate,

    #[serde(default)]
    pub machines: Vec<Machine>,

    //=== Timestamps ===
    pub created_at: i64,
    pub updated_at: i64,
}

impl Stop {
    /// Create a weekly stop with no service days or machines yet.
    pub fn new(name: &str, driver_id: &str, start_date: NaiveDate) -> Self {
        let now = now_ms();
        Self {
            id: generate_stop_id(),
            name: name.to_string(),
            address: None,
            driver_id: driver_id.to_string(),
            days_of_week: vec![],
            cadence: Cadence::Weekly,
            week_bucket: None,
            start_date,
            machines: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    pub fn with_days(mut self, days: &[DayOfWeek]) -> Self {
        self.days_of_week = days.to_vec();
        self
    }

    pub fn with_machines(mut self, machines: &[Machine]) -> Self {
        self.machines = machines.to_vec();
        self
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        let (cadence, bucket) = schedule.into_parts();
        self.cadence = cadence;
        self.week_bucket = bucket;
        self
    }

    /// Typed view of the stop's cadence fields.
    pub fn schedule(&self) -> Result<Schedule> {
        Schedule::from_parts(&self.cadence, self.week_bucket.as_ref())
    }

    /// Whether the stop is eligible for service on this weekday at all.
    pub fn serves_on(&self, day: DayOfWeek) -> bool {
        self.days_of_week.contains(&day)
    }

    /// Check the record is complete enough to be saved.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RoutebookError::InvalidInput("stop name is required".to_string()));
        }
        if self.driver_id.trim().is_empty() {
            return Err(RoutebookError::InvalidInput(format!(
                "stop '{}' has no driver assigned",
                self.name
            )));
        }
        if self.days_of_week.is_empty() {
            return Err(RoutebookError::InvalidInput(format!(
                "stop '{}' needs at least one service day",
                self.name
            )));
        }
        if self.machines.is_empty() {
            return Err(RoutebookError::InvalidInput(format!(
                "stop '{}' needs at least one machine",
                self.name
            )));
        }
        self.schedule()?;
        Ok(())
    }

    /// Bump `updated_at` after an edit.
    pub fn touch(&mut self) {
        self.updated_at = now_ms();
    }
}
