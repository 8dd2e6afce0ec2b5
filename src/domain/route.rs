//! Route record: one driver's ordered stops for one weekday.

use serde::{Deserialize, Serialize};

use crate::domain::cadence::{Cadence, WeekBucket};
use crate::domain::weekday::DayOfWeek;
use crate::error::Result;
use crate::id::{generate_route_id, now_ms};
use crate::sequence::{Membership, RouteSequence, RouteStop};

/// The ordered assignment of stops to a driver for one weekday.
///
/// The route owns its sequence; stops are referenced by id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub driver_id: String,
    pub day_of_week: DayOfWeek,

    #[serde(rename = "route_stops", default)]
    pub sequence: RouteSequence,

    pub created_at: i64,
    pub updated_at: i64,
}

/// Older route layout that stored a bare array of stop ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyRoute {
    pub id: String,
    pub driver_id: String,
    pub day_of_week: DayOfWeek,
    #[serde(default)]
    pub stops: Vec<String>,
}

impl Route {
    /// Create an empty route for a driver and weekday.
    pub fn new(driver_id: &str, day_of_week: DayOfWeek) -> Self {
        let now = now_ms();
        Self {
            id: generate_route_id(),
            driver_id: driver_id.to_string(),
            day_of_week,
            sequence: RouteSequence::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn append(&mut self, stop_id: &str, membership: Membership) -> Result<&RouteStop> {
        let id = &self.id;
        self.sequence.append(stop_id, membership).map_err(|e| e.on_route(id))
    }

    pub fn remove_at(&mut self, position: u32) -> Result<RouteStop> {
        self.sequence.remove_at(position).map_err(|e| e.on_route(&self.id))
    }

    pub fn remove_stop(&mut self, stop_id: &str) -> Result<RouteStop> {
        self.sequence.remove_stop(stop_id).map_err(|e| e.on_route(&self.id))
    }

    pub fn move_by(&mut self, position: u32, delta: i64) -> Result<bool> {
        self.sequence.move_by(position, delta).map_err(|e| e.on_route(&self.id))
    }

    pub fn set_cadence(&mut self, stop_id: &str, cadence: Cadence) -> Result<()> {
        self.sequence.set_cadence(stop_id, cadence).map_err(|e| e.on_route(&self.id))
    }

    pub fn set_week_bucket(&mut self, stop_id: &str, bucket: WeekBucket) -> Result<()> {
        self.sequence
            .set_week_bucket(stop_id, bucket)
            .map_err(|e| e.on_route(&self.id))
    }

    pub fn set_membership(&mut self, stop_id: &str, membership: Membership) -> Result<()> {
        self.sequence
            .set_membership(stop_id, membership)
            .map_err(|e| e.on_route(&self.id))
    }

    /// Change which weekday this route runs on. The sequence is untouched.
    pub fn reassign_weekday(&mut self, day: DayOfWeek) {
        self.day_of_week = day;
    }

    pub fn touch(&mut self) {
        self.updated_at = now_ms();
    }
}

impl From<LegacyRoute> for Route {
    fn from(legacy: LegacyRoute) -> Self {
        let now = now_ms();
        Self {
            id: legacy.id,
            driver_id: legacy.driver_id,
            day_of_week: legacy.day_of_week,
            sequence: RouteSequence::from_stop_ids(legacy.stops),
            created_at: now,
            updated_at: now,
        }
    }
}
