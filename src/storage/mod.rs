//! Storage layer for Routebook.
//!
//! The engine reads stops and routes and writes routes back through the
//! `ScheduleRepository` trait. Two backends implement it:
//! - `JsonlRepository`: JSONL collections with an in-memory cache
//! - `SqliteRepository`: SQLite tables keyed the way the records relate

mod jsonl;
mod repository;
mod routes;
mod sqlite;
mod stops;
mod traits;

pub use jsonl::JsonlStorage;
pub use repository::{JsonlRepository, ScheduleRepository};
pub use routes::{ROUTES_COLLECTION, RouteStore};
pub use sqlite::SqliteRepository;
pub use stops::{STOPS_COLLECTION, StopStore};
pub use traits::{Filter, HasId, Storage};
