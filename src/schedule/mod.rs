//! Recurring schedule resolution.
//!
//! - `calendar`: week-bucket parity and the reference clock
//! - `due`: whether a stop needs a visit on a date
//! - `manifest`: the ordered list of stops due for a driver

pub mod calendar;
pub mod due;
pub mod manifest;

pub use calendar::{ReferenceClock, resolve_week_bucket};
pub use due::{Schedule, is_due_on, is_due_with, next_due_on_or_after};
pub use manifest::{Manifest, ManifestBuilder, ManifestEntry, ManifestMode, ManifestWarning};
