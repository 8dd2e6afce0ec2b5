//! Error types for Routebook
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::domain::DayOfWeek;

/// All error types that can occur in Routebook
#[derive(Debug, Error)]
pub enum RoutebookError {
    /// Cadence/week-bucket combination is invalid, or a value is unrecognized
    #[error("Invalid schedule configuration: {0}")]
    InvalidScheduleConfiguration(String),

    /// Route, stop, or route entry not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stop already has an entry on the route
    #[error("Stop {stop_id} is already on route {route_id}")]
    DuplicateStop { route_id: String, stop_id: String },

    /// A driver already has a route for this weekday
    #[error("Driver {driver_id} already has a route for {day}")]
    RouteConflict { driver_id: String, day: DayOfWeek },

    /// Record failed validation before being saved
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persisted route sequence breaks the dense position contract
    #[error("Corrupt route sequence: {0}")]
    CorruptSequence(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type alias for Routebook operations
pub type Result<T> = std::result::Result<T, RoutebookError>;
