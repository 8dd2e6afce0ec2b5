//! Route Manager module
//!
//! Applies route sequence edits against storage, one writer per route.

mod route_manager;

pub use route_manager::{RouteManager, RouteSummary, UNKNOWN_STOP};
