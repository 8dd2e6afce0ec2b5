//! Domain types for Routebook
//!
//! - Stop: a serviced location with its schedule attributes
//! - Route: a driver's ordered stop sequence for one weekday
//! - Cadence / WeekBucket: weekly vs. alternating-week visit policy
//! - DayOfWeek: weekday names as stored on stops and routes

pub mod cadence;
pub mod route;
pub mod stop;
pub mod weekday;

pub use cadence::{Cadence, WeekBucket};
pub use route::{LegacyRoute, Route};
pub use stop::{Machine, Stop};
pub use weekday::DayOfWeek;
