//! Persistence boundary used by the scheduling engine.

use std::path::Path;

use super::jsonl::JsonlStorage;
use super::routes::RouteStore;
use super::stops::StopStore;
use crate::domain::{DayOfWeek, Route, Stop};
use crate::error::{Result, RoutebookError};

/// Read/write access to stops and routes.
///
/// `save_route` must replace the whole route, sequence included, or leave the
/// stored copy untouched.
pub trait ScheduleRepository: Send + Sync {
    fn stop(&self, id: &str) -> Result<Option<Stop>>;

    fn stops(&self) -> Result<Vec<Stop>>;

    fn stops_for_driver(&self, driver_id: &str) -> Result<Vec<Stop>>;

    /// Insert or replace a stop.
    fn save_stop(&self, stop: &Stop) -> Result<()>;

    fn delete_stop(&self, id: &str) -> Result<()>;

    fn route(&self, id: &str) -> Result<Option<Route>>;

    fn route_for(&self, driver_id: &str, day: DayOfWeek) -> Result<Option<Route>>;

    fn routes_for_driver(&self, driver_id: &str) -> Result<Vec<Route>>;

    /// Store a new route. Fails with `RouteConflict` if the driver already has
    /// a route for that weekday.
    fn insert_route(&self, route: &Route) -> Result<()>;

    /// Replace an existing route as a whole.
    fn save_route(&self, route: &Route) -> Result<()>;

    /// Delete a route together with its sequence.
    fn delete_route(&self, id: &str) -> Result<()>;
}

/// `ScheduleRepository` over JSONL collections.
#[derive(Debug)]
pub struct JsonlRepository {
    storage: JsonlStorage,
}

impl JsonlRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            storage: JsonlStorage::new(path)?,
        })
    }

    pub fn from_storage(storage: JsonlStorage) -> Self {
        Self { storage }
    }

    fn stops_store(&self) -> StopStore<'_, JsonlStorage> {
        StopStore::new(&self.storage)
    }

    fn routes_store(&self) -> RouteStore<'_, JsonlStorage> {
        RouteStore::new(&self.storage)
    }

    /// Import routes kept in the old bare-id-array layout.
    pub fn migrate_legacy_routes(&self, legacy_collection: &str) -> Result<usize> {
        self.routes_store().migrate_legacy(legacy_collection)
    }

    fn ensure_day_free(&self, route: &Route) -> Result<()> {
        match self.routes_store().find_for_day(&route.driver_id, route.day_of_week)? {
            Some(existing) if existing.id != route.id => Err(RoutebookError::RouteConflict {
                driver_id: route.driver_id.clone(),
                day: route.day_of_week,
            }),
            _ => Ok(()),
        }
    }
}

impl ScheduleRepository for JsonlRepository {
    fn stop(&self, id: &str) -> Result<Option<Stop>> {
        self.stops_store().get(id)
    }

    fn stops(&self) -> Result<Vec<Stop>> {
        self.stops_store().list_all()
    }

    fn stops_for_driver(&self, driver_id: &str) -> Result<Vec<Stop>> {
        self.stops_store().find_by_driver(driver_id)
    }

    fn save_stop(&self, stop: &Stop) -> Result<()> {
        let store = self.stops_store();
        if store.get(&stop.id)?.is_some() {
            store.update(stop)
        } else {
            store.create(stop)
        }
    }

    fn delete_stop(&self, id: &str) -> Result<()> {
        self.stops_store().delete(id)
    }

    fn route(&self, id: &str) -> Result<Option<Route>> {
        self.routes_store().get(id)
    }

    fn route_for(&self, driver_id: &str, day: DayOfWeek) -> Result<Option<Route>> {
        self.routes_store().find_for_day(driver_id, day)
    }

    fn routes_for_driver(&self, driver_id: &str) -> Result<Vec<Route>> {
        self.routes_store().find_by_driver(driver_id)
    }

    fn insert_route(&self, route: &Route) -> Result<()> {
        self.ensure_day_free(route)?;
        self.routes_store().create(route)
    }

    fn save_route(&self, route: &Route) -> Result<()> {
        self.ensure_day_free(route)?;
        self.routes_store().update(route)
    }

    fn delete_route(&self, id: &str) -> Result<()> {
        self.routes_store().delete(id)
    }
}
