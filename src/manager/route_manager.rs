//! Route Manager implementation
//!
//! Every edit is a read-modify-write of one whole route: load the stored
//! route, apply the operation to a copy, persist the copy, return it. The
//! per-route lock is held for the whole cycle. If the write fails the stored
//! route is unchanged and the caller retries the operation from scratch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{Cadence, DayOfWeek, Route, WeekBucket};
use crate::error::{Result, RoutebookError};
use crate::sequence::{Membership, RouteStop};
use crate::storage::ScheduleRepository;

/// A route with its stops resolved to names, for listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub route: Route,
    /// One name per entry in position order; "Unknown stop" for deleted stops
    pub stop_names: Vec<String>,
}

/// Name shown for route entries whose stop no longer exists.
pub const UNKNOWN_STOP: &str = "Unknown stop";

/// Serializes and persists route edits.
pub struct RouteManager<R: ScheduleRepository + ?Sized> {
    repo: Arc<R>,
    /// Held while checking and claiming a (driver, weekday) slot
    registry: Mutex<()>,
    route_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> RoutebookError {
    RoutebookError::Storage(format!("lock poisoned: {}", e))
}

impl<R: ScheduleRepository + ?Sized> RouteManager<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            registry: Mutex::new(()),
            route_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn repo(&self) -> &Arc<R> {
        &self.repo
    }

    fn route_lock(&self, route_id: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.route_locks.lock().map_err(poisoned)?;
        Ok(locks
            .entry(route_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    fn registry(&self) -> Result<MutexGuard<'_, ()>> {
        self.registry.lock().map_err(poisoned)
    }

    fn ensure_stop_exists(&self, stop_id: &str) -> Result<()> {
        match self.repo.stop(stop_id)? {
            Some(_) => Ok(()),
            None => Err(RoutebookError::NotFound(format!("stop {}", stop_id))),
        }
    }

    /// Run `edit` against a copy of the stored route and persist the result.
    ///
    /// Edits that leave the route unchanged are not written.
    fn mutate<T, F>(&self, route_id: &str, edit: F) -> Result<(Route, T)>
    where
        F: FnOnce(&mut Route) -> Result<T>,
    {
        let lock = self.route_lock(route_id)?;
        let _guard = lock.lock().map_err(poisoned)?;

        let stored = self
            .repo
            .route(route_id)?
            .ok_or_else(|| RoutebookError::NotFound(format!("route {}", route_id)))?;

        let mut working = stored.clone();
        let outcome = edit(&mut working)?;
        if working == stored {
            return Ok((stored, outcome));
        }

        working.touch();
        self.repo.save_route(&working)?;
        log::debug!(
            "Saved route {} ({} entries, {})",
            working.id,
            working.sequence.len(),
            working.day_of_week
        );
        Ok((working, outcome))
    }

    /// Create a driver's route for a weekday with an initial list of stops.
    pub fn create_route(&self, driver_id: &str, day: DayOfWeek, stop_ids: &[&str]) -> Result<Route> {
        if driver_id.trim().is_empty() {
            return Err(RoutebookError::InvalidInput("a route needs a driver".to_string()));
        }
        if stop_ids.is_empty() {
            return Err(RoutebookError::InvalidInput(
                "a route needs at least one stop".to_string(),
            ));
        }

        let mut route = Route::new(driver_id, day);
        for stop_id in stop_ids {
            self.ensure_stop_exists(stop_id)?;
            route.append(stop_id, Membership::Simple)?;
        }

        let _registry = self.registry()?;
        if self.repo.route_for(driver_id, day)?.is_some() {
            return Err(RoutebookError::RouteConflict {
                driver_id: driver_id.to_string(),
                day,
            });
        }
        self.repo.insert_route(&route)?;
        log::info!("Created route {} for driver {} on {}", route.id, driver_id, day);
        Ok(route)
    }

    /// Put a stop on the driver's route for `day`, creating the route if this
    /// is its first stop.
    pub fn assign_stop(&self, driver_id: &str, day: DayOfWeek, stop_id: &str) -> Result<Route> {
        let existing = {
            let _registry = self.registry()?;
            match self.repo.route_for(driver_id, day)? {
                Some(route) => route,
                None => {
                    self.ensure_stop_exists(stop_id)?;
                    let mut route = Route::new(driver_id, day);
                    route.append(stop_id, Membership::Simple)?;
                    self.repo.insert_route(&route)?;
                    log::info!("Created route {} for driver {} on {}", route.id, driver_id, day);
                    return Ok(route);
                }
            }
        };
        self.append(&existing.id, stop_id, Membership::Simple)
    }

    /// Add a stop at the end of a route.
    pub fn append(&self, route_id: &str, stop_id: &str, membership: Membership) -> Result<Route> {
        self.ensure_stop_exists(stop_id)?;
        let (route, _) = self.mutate(route_id, |route| {
            route.append(stop_id, membership)?;
            Ok(())
        })?;
        Ok(route)
    }

    /// Remove the entry at `position` and compact the rest.
    pub fn remove_at(&self, route_id: &str, position: u32) -> Result<(Route, RouteStop)> {
        self.mutate(route_id, |route| route.remove_at(position))
    }

    /// Remove a stop's entry and compact the rest.
    pub fn remove_stop(&self, route_id: &str, stop_id: &str) -> Result<(Route, RouteStop)> {
        self.mutate(route_id, |route| route.remove_stop(stop_id))
    }

    /// Swap the entry at `position` with the one `delta` places away.
    ///
    /// The flag is false when the move ran past either end and nothing changed.
    pub fn move_by(&self, route_id: &str, position: u32, delta: i64) -> Result<(Route, bool)> {
        self.mutate(route_id, |route| route.move_by(position, delta))
    }

    pub fn set_cadence(&self, route_id: &str, stop_id: &str, cadence: Cadence) -> Result<Route> {
        let (route, _) = self.mutate(route_id, |route| route.set_cadence(stop_id, cadence))?;
        Ok(route)
    }

    pub fn set_week_bucket(&self, route_id: &str, stop_id: &str, bucket: WeekBucket) -> Result<Route> {
        let (route, _) = self.mutate(route_id, |route| route.set_week_bucket(stop_id, bucket))?;
        Ok(route)
    }

    /// Set an entry's cadence override and, when given, its week bucket in
    /// one edit. If either part is rejected nothing is stored.
    pub fn set_schedule(
        &self,
        route_id: &str,
        stop_id: &str,
        cadence: Cadence,
        bucket: Option<WeekBucket>,
    ) -> Result<Route> {
        let (route, _) = self.mutate(route_id, |route| {
            route.set_cadence(stop_id, cadence)?;
            if let Some(bucket) = bucket {
                route.set_week_bucket(stop_id, bucket)?;
            }
            Ok(())
        })?;
        Ok(route)
    }

    /// Move a route to another weekday, keeping its sequence.
    pub fn reassign_weekday(&self, route_id: &str, day: DayOfWeek) -> Result<Route> {
        let _registry = self.registry()?;
        let (route, _) = self.mutate(route_id, |route| {
            if route.day_of_week != day && self.repo.route_for(&route.driver_id, day)?.is_some() {
                return Err(RoutebookError::RouteConflict {
                    driver_id: route.driver_id.clone(),
                    day,
                });
            }
            route.reassign_weekday(day);
            Ok(())
        })?;
        Ok(route)
    }

    /// Delete a route and its whole sequence.
    pub fn delete_route(&self, route_id: &str) -> Result<()> {
        let lock = self.route_lock(route_id)?;
        {
            let _guard = lock.lock().map_err(poisoned)?;
            self.repo.delete_route(route_id)?;
        }
        self.route_locks.lock().map_err(poisoned)?.remove(route_id);
        log::info!("Deleted route {}", route_id);
        Ok(())
    }

    pub fn route(&self, route_id: &str) -> Result<Option<Route>> {
        self.repo.route(route_id)
    }

    /// Names of a route's stops in position order, `UNKNOWN_STOP` for
    /// entries whose stop was deleted.
    pub fn stop_names(&self, route: &Route) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(route.sequence.len());
        for entry in route.sequence.iter() {
            names.push(match self.repo.stop(&entry.stop_id)? {
                Some(stop) => stop.name,
                None => UNKNOWN_STOP.to_string(),
            });
        }
        Ok(names)
    }

    /// A driver's routes in weekday order, with stop names resolved.
    pub fn routes_for_driver(&self, driver_id: &str) -> Result<Vec<RouteSummary>> {
        let mut routes = self.repo.routes_for_driver(driver_id)?;
        routes.sort_by_key(|r| r.day_of_week);

        let mut summaries = Vec::with_capacity(routes.len());
        for route in routes {
            let stop_names = self.stop_names(&route)?;
            summaries.push(RouteSummary { route, stop_names });
        }
        Ok(summaries)
    }
}
