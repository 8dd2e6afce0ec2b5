//! Two-pool route editing.
//!
//! The administrator sees every stop split into an "available" pool and the
//! route's selected sequence. Moving a stop into the route appends it; moving
//! it out removes it and compacts the remaining positions.

use crate::domain::route::Route;
use crate::error::{Result, RoutebookError};
use crate::sequence::Membership;

/// Editing session over one route and the stops not yet on it.
#[derive(Debug, Clone)]
pub struct RouteEditor {
    route: Route,
    available: Vec<String>,
}

impl RouteEditor {
    /// Start editing `route`; `all_stop_ids` is every stop that could be on it,
    /// in the order the available pool should list them.
    pub fn new<I, S>(route: Route, all_stop_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut available: Vec<String> = Vec::new();
        for stop_id in all_stop_ids {
            let stop_id = stop_id.into();
            if !route.sequence.contains(&stop_id) && !available.contains(&stop_id) {
                available.push(stop_id);
            }
        }
        Self { route, available }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn available(&self) -> &[String] {
        &self.available
    }

    /// Move a stop from the available pool onto the end of the route.
    pub fn move_to_selected(&mut self, stop_id: &str) -> Result<()> {
        let index = self
            .available
            .iter()
            .position(|s| s == stop_id)
            .ok_or_else(|| RoutebookError::NotFound(format!("stop {} is not in the available pool", stop_id)))?;
        self.route.append(stop_id, Membership::Simple)?;
        self.available.remove(index);
        Ok(())
    }

    /// Take a stop off the route and put it back at the end of the available pool.
    pub fn move_to_available(&mut self, stop_id: &str) -> Result<()> {
        let removed = self.route.remove_stop(stop_id)?;
        self.available.push(removed.stop_id);
        Ok(())
    }

    pub fn move_up(&mut self, position: u32) -> Result<bool> {
        self.route.move_by(position, -1)
    }

    pub fn move_down(&mut self, position: u32) -> Result<bool> {
        self.route.move_by(position, 1)
    }

    /// Finish editing and hand back the route.
    pub fn into_route(self) -> Route {
        self.route
    }
}
