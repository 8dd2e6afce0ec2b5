//! Routebook - recurring service schedules and driver route sequencing
//!
//! Decides which vending stops a driver must visit on a calendar date
//! (weekly or A/B biweekly cadence) and keeps each driver's per-weekday
//! route as a dense, ordered sequence of stops.

pub mod domain;
pub mod error;
pub mod id;
pub mod manager;
pub mod schedule;
pub mod sequence;
pub mod storage;

pub use error::{Result, RoutebookError};
