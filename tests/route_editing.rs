//! Route sequence editing through the manager: density, boundaries,
//! failed writes and concurrent edits.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use routebook::domain::{DayOfWeek, Machine, Route, Stop};
use routebook::manager::RouteManager;
use routebook::sequence::Membership;
use routebook::storage::{ScheduleRepository, SqliteRepository};
use routebook::{Result, RoutebookError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

fn seed_stops(repo: &impl ScheduleRepository, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let stop = Stop::new(&format!("Stop {}", i), "d1", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
                .with_days(&[DayOfWeek::Monday])
                .with_machines(&[Machine::Soda]);
            repo.save_stop(&stop).unwrap();
            stop.id
        })
        .collect()
}

fn assert_dense(route: &Route) {
    let expected: Vec<u32> = (0..route.sequence.len() as u32).collect();
    assert_eq!(route.sequence.positions(), expected);
}

#[test]
fn test_random_edits_keep_positions_dense() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let stops = seed_stops(repo.as_ref(), 12);
    let manager = RouteManager::new(repo.clone());
    let route_id = manager.create_route("d1", DayOfWeek::Monday, &[&stops[0]]).unwrap().id;

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let current = manager.route(&route_id).unwrap().unwrap();
        let len = current.sequence.len() as u32;
        let result = match rng.random_range(0..3) {
            0 => {
                let candidate = &stops[rng.random_range(0..stops.len())];
                manager.append(&route_id, candidate, Membership::Simple).map(|_| ())
            }
            1 if len > 1 => manager.remove_at(&route_id, rng.random_range(0..len)).map(|_| ()),
            _ if len > 0 => {
                let delta = rng.random_range(-3i64..=3);
                manager.move_by(&route_id, rng.random_range(0..len), delta).map(|_| ())
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            assert!(matches!(e, RoutebookError::DuplicateStop { .. }), "unexpected error: {}", e);
        }

        let stored = manager.route(&route_id).unwrap().unwrap();
        assert_dense(&stored);
    }
}

#[test]
fn test_remove_then_reappend_is_valid() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let stops = seed_stops(repo.as_ref(), 3);
    let manager = RouteManager::new(repo);
    let ids: Vec<&str> = stops.iter().map(String::as_str).collect();
    let route = manager.create_route("d1", DayOfWeek::Monday, &ids).unwrap();

    let (_, removed) = manager.remove_stop(&route.id, &stops[0]).unwrap();
    let route = manager.append(&route.id, &removed.stop_id, Membership::Simple).unwrap();

    assert_eq!(route.sequence.stop_ids(), vec![ids[1], ids[2], ids[0]]);
    assert_dense(&route);
}

#[test]
fn test_moves_past_either_end_are_noops() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let stops = seed_stops(repo.as_ref(), 3);
    let manager = RouteManager::new(repo);
    let ids: Vec<&str> = stops.iter().map(String::as_str).collect();
    let route = manager.create_route("d1", DayOfWeek::Monday, &ids).unwrap();

    let (first, moved_up) = manager.move_by(&route.id, 0, -1).unwrap();
    let (last, moved_down) = manager.move_by(&route.id, 2, 1).unwrap();

    assert!(!moved_up && !moved_down);
    assert_eq!(first, route);
    assert_eq!(last, route);
    assert_eq!(
        serde_json::to_string(&manager.route(&route.id).unwrap().unwrap()).unwrap(),
        serde_json::to_string(&route).unwrap()
    );
}

/// Repository whose route writes fail while `fail_writes` is set.
struct FlakyRepository {
    inner: SqliteRepository,
    fail_writes: AtomicBool,
}

impl ScheduleRepository for FlakyRepository {
    fn stop(&self, id: &str) -> Result<Option<Stop>> {
        self.inner.stop(id)
    }

    fn stops(&self) -> Result<Vec<Stop>> {
        self.inner.stops()
    }

    fn stops_for_driver(&self, driver_id: &str) -> Result<Vec<Stop>> {
        self.inner.stops_for_driver(driver_id)
    }

    fn save_stop(&self, stop: &Stop) -> Result<()> {
        self.inner.save_stop(stop)
    }

    fn delete_stop(&self, id: &str) -> Result<()> {
        self.inner.delete_stop(id)
    }

    fn route(&self, id: &str) -> Result<Option<Route>> {
        self.inner.route(id)
    }

    fn route_for(&self, driver_id: &str, day: DayOfWeek) -> Result<Option<Route>> {
        self.inner.route_for(driver_id, day)
    }

    fn routes_for_driver(&self, driver_id: &str) -> Result<Vec<Route>> {
        self.inner.routes_for_driver(driver_id)
    }

    fn insert_route(&self, route: &Route) -> Result<()> {
        self.inner.insert_route(route)
    }

    fn save_route(&self, route: &Route) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RoutebookError::Storage("disk unavailable".to_string()));
        }
        self.inner.save_route(route)
    }

    fn delete_route(&self, id: &str) -> Result<()> {
        self.inner.delete_route(id)
    }
}

#[test]
fn test_failed_write_leaves_route_untouched() {
    let repo = Arc::new(FlakyRepository {
        inner: SqliteRepository::open_in_memory().unwrap(),
        fail_writes: AtomicBool::new(false),
    });
    let stops = seed_stops(repo.as_ref(), 3);
    let manager = RouteManager::new(repo.clone());
    let ids: Vec<&str> = stops.iter().map(String::as_str).collect();
    let route = manager.create_route("d1", DayOfWeek::Monday, &ids[..2]).unwrap();

    repo.fail_writes.store(true, Ordering::SeqCst);
    assert!(manager.move_by(&route.id, 0, 1).is_err());
    assert!(manager.remove_at(&route.id, 0).is_err());
    assert!(manager.append(&route.id, ids[2], Membership::Simple).is_err());
    assert_eq!(manager.route(&route.id).unwrap().unwrap(), route);

    // Retrying after the fault clears applies the edit once
    repo.fail_writes.store(false, Ordering::SeqCst);
    let route = manager.append(&route.id, ids[2], Membership::Simple).unwrap();
    assert_eq!(route.sequence.stop_ids(), ids);
}

#[test]
fn test_concurrent_appends_are_serialized() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let stops = seed_stops(repo.as_ref(), 16);
    let manager = Arc::new(RouteManager::new(repo));
    let route_id = manager.create_route("d1", DayOfWeek::Monday, &[&stops[0]]).unwrap().id;

    let handles: Vec<_> = stops[1..]
        .chunks(5)
        .map(|chunk| {
            let manager = Arc::clone(&manager);
            let route_id = route_id.clone();
            let chunk = chunk.to_vec();
            thread::spawn(move || {
                for stop_id in chunk {
                    manager.append(&route_id, &stop_id, Membership::Simple).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let route = manager.route(&route_id).unwrap().unwrap();
    assert_eq!(route.sequence.len(), stops.len());
    assert_dense(&route);
    for stop_id in &stops {
        assert!(route.sequence.contains(stop_id));
    }
}

#[test]
fn test_concurrent_assign_creates_one_route() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let stops = seed_stops(repo.as_ref(), 8);
    let manager = Arc::new(RouteManager::new(repo.clone()));

    let handles: Vec<_> = stops
        .iter()
        .cloned()
        .map(|stop_id| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.assign_stop("d1", DayOfWeek::Thursday, &stop_id).map(|_| ()))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let routes = repo.routes_for_driver("d1").unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].sequence.len(), stops.len());
    assert_dense(&routes[0]);
}
