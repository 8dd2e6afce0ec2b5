//! SQLite-backed `ScheduleRepository`.
//!
//! Layout:
//! - `stops`: one row per stop, indexed by driver, full record as JSON
//! - `routes`: one row per route, unique on `(driver_id, day_of_week)`
//! - `route_stops`: one row per entry, keyed by `(route_id, position)`
//!
//! `route_stops.stop_id` has no foreign key: stops can be
//! deleted while routes still reference them.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode, OptionalExtension, Transaction, params};

use super::repository::ScheduleRepository;
use crate::domain::{DayOfWeek, Route, Stop};
use crate::error::{Result, RoutebookError};
use crate::sequence::{Membership, RouteSequence, RouteStop};

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS stops (
        id TEXT PRIMARY KEY,
        driver_id TEXT NOT NULL,
        json_data TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_stops_driver ON stops(driver_id);

    CREATE TABLE IF NOT EXISTS routes (
        id TEXT PRIMARY KEY,
        driver_id TEXT NOT NULL,
        day_of_week TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE (driver_id, day_of_week)
    );

    CREATE TABLE IF NOT EXISTS route_stops (
        route_id TEXT NOT NULL REFERENCES routes(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        stop_id TEXT NOT NULL,
        membership TEXT NOT NULL,
        PRIMARY KEY (route_id, position),
        UNIQUE (route_id, stop_id)
    );
"#;

/// Repository storing stops and routes in a single SQLite database.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRepository").finish_non_exhaustive()
    }
}

struct RouteRow {
    id: String,
    driver_id: String,
    day_of_week: String,
    created_at: i64,
    updated_at: i64,
}

impl SqliteRepository {
    /// Open or create the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| RoutebookError::Storage(e.to_string()))
    }

    fn load_route(conn: &Connection, row: RouteRow) -> Result<Route> {
        let day: DayOfWeek = row.day_of_week.parse()?;

        let mut stmt =
            conn.prepare("SELECT stop_id, position, membership FROM route_stops WHERE route_id = ?1 ORDER BY position")?;
        let raw = stmt
            .query_map(params![row.id], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?, r.get::<_, String>(2)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut entries = Vec::with_capacity(raw.len());
        for (stop_id, position, membership) in raw {
            let position = u32::try_from(position).map_err(|_| {
                RoutebookError::CorruptSequence(format!("route {}: negative position {}", row.id, position))
            })?;
            let membership: Membership = serde_json::from_str(&membership)?;
            entries.push(RouteStop {
                stop_id,
                position,
                membership,
            });
        }
        let sequence = RouteSequence::try_from(entries).map_err(|e| e.on_route(&row.id))?;

        Ok(Route {
            id: row.id,
            driver_id: row.driver_id,
            day_of_week: day,
            sequence,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn query_routes(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Route>> {
        let conn = self.conn()?;
        let rows = {
            let mut stmt = conn.prepare(sql)?;
            stmt.query_map(args, |r| {
                Ok(RouteRow {
                    id: r.get(0)?,
                    driver_id: r.get(1)?,
                    day_of_week: r.get(2)?,
                    created_at: r.get(3)?,
                    updated_at: r.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        rows.into_iter().map(|row| Self::load_route(&conn, row)).collect()
    }

    fn write_entries(tx: &Transaction<'_>, route: &Route) -> Result<()> {
        tx.execute("DELETE FROM route_stops WHERE route_id = ?1", params![route.id])?;
        let mut stmt =
            tx.prepare("INSERT INTO route_stops (route_id, position, stop_id, membership) VALUES (?1, ?2, ?3, ?4)")?;
        for entry in route.sequence.iter() {
            stmt.execute(params![
                route.id,
                i64::from(entry.position),
                entry.stop_id,
                serde_json::to_string(&entry.membership)?
            ])?;
        }
        Ok(())
    }

    fn stops_where(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Stop>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let raw = stmt
            .query_map(args, |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.iter()
            .map(|json| serde_json::from_str(json).map_err(RoutebookError::from))
            .collect()
    }
}

/// Turn a uniqueness violation on `routes` into a route conflict.
fn conflict_or(err: rusqlite::Error, route: &Route) -> RoutebookError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            RoutebookError::RouteConflict {
                driver_id: route.driver_id.clone(),
                day: route.day_of_week,
            }
        }
        _ => RoutebookError::from(err),
    }
}

const ROUTE_COLUMNS: &str = "SELECT id, driver_id, day_of_week, created_at, updated_at FROM routes";

impl ScheduleRepository for SqliteRepository {
    fn stop(&self, id: &str) -> Result<Option<Stop>> {
        let conn = self.conn()?;
        let json: Option<String> = conn
            .query_row("SELECT json_data FROM stops WHERE id = ?1", params![id], |r| r.get(0))
            .optional()?;
        json.map(|j| serde_json::from_str(&j).map_err(RoutebookError::from))
            .transpose()
    }

    fn stops(&self) -> Result<Vec<Stop>> {
        self.stops_where("SELECT json_data FROM stops ORDER BY rowid", &[])
    }

    fn stops_for_driver(&self, driver_id: &str) -> Result<Vec<Stop>> {
        self.stops_where(
            "SELECT json_data FROM stops WHERE driver_id = ?1 ORDER BY rowid",
            &[&driver_id],
        )
    }

    fn save_stop(&self, stop: &Stop) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO stops (id, driver_id, json_data) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET driver_id = excluded.driver_id, json_data = excluded.json_data",
            params![stop.id, stop.driver_id, serde_json::to_string(stop)?],
        )?;
        Ok(())
    }

    fn delete_stop(&self, id: &str) -> Result<()> {
        let conn = self.conn()?;
        if conn.execute("DELETE FROM stops WHERE id = ?1", params![id])? == 0 {
            return Err(RoutebookError::NotFound(format!("stop {}", id)));
        }
        Ok(())
    }

    fn route(&self, id: &str) -> Result<Option<Route>> {
        let sql = format!("{} WHERE id = ?1", ROUTE_COLUMNS);
        Ok(self.query_routes(&sql, &[&id])?.into_iter().next())
    }

    fn route_for(&self, driver_id: &str, day: DayOfWeek) -> Result<Option<Route>> {
        let sql = format!("{} WHERE driver_id = ?1 AND day_of_week = ?2", ROUTE_COLUMNS);
        Ok(self.query_routes(&sql, &[&driver_id, &day.name()])?.into_iter().next())
    }

    fn routes_for_driver(&self, driver_id: &str) -> Result<Vec<Route>> {
        let sql = format!("{} WHERE driver_id = ?1 ORDER BY rowid", ROUTE_COLUMNS);
        self.query_routes(&sql, &[&driver_id])
    }

    fn insert_route(&self, route: &Route) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO routes (id, driver_id, day_of_week, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                route.id,
                route.driver_id,
                route.day_of_week.name(),
                route.created_at,
                route.updated_at
            ],
        )
        .map_err(|e| conflict_or(e, route))?;
        Self::write_entries(&tx, route)?;
        tx.commit()?;
        Ok(())
    }

    fn save_route(&self, route: &Route) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let changed = tx
            .execute(
                "UPDATE routes SET driver_id = ?2, day_of_week = ?3, updated_at = ?4 WHERE id = ?1",
                params![route.id, route.driver_id, route.day_of_week.name(), route.updated_at],
            )
            .map_err(|e| conflict_or(e, route))?;
        if changed == 0 {
            return Err(RoutebookError::NotFound(format!("route {}", route.id)));
        }
        Self::write_entries(&tx, route)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_route(&self, id: &str) -> Result<()> {
        let conn = self.conn()?;
        if conn.execute("DELETE FROM routes WHERE id = ?1", params![id])? == 0 {
            return Err(RoutebookError::NotFound(format!("route {}", id)));
        }
        Ok(())
    }
}
