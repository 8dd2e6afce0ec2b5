//! Route-specific storage helpers.

use super::traits::{Filter, HasId, Storage};
use crate::domain::{DayOfWeek, LegacyRoute, Route};
use crate::error::Result;

/// Collection name for routes. Each record embeds its ordered route stops.
pub const ROUTES_COLLECTION: &str = "routes";

impl HasId for Route {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Helper for route-specific queries.
pub struct RouteStore<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> RouteStore<'a, S> {
    /// Create a new RouteStore wrapping the given storage.
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Find all routes belonging to a driver.
    pub fn find_by_driver(&self, driver_id: &str) -> Result<Vec<Route>> {
        self.storage
            .query(ROUTES_COLLECTION, &[Filter::eq("driver_id", driver_id)])
    }

    /// Find the driver's route for a weekday.
    ///
    /// Matches on the raw `day_of_week` before decoding, so short day names
    /// are found and a corrupt route on another weekday is never decoded.
    pub fn find_for_day(&self, driver_id: &str, day: DayOfWeek) -> Result<Option<Route>> {
        let records: Vec<serde_json::Value> = self
            .storage
            .query(ROUTES_COLLECTION, &[Filter::eq("driver_id", driver_id)])?;
        for record in records {
            let record_day = record
                .get("day_of_week")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse::<DayOfWeek>().ok());
            if record_day == Some(day) {
                return Ok(Some(serde_json::from_value(record)?));
            }
        }
        Ok(None)
    }

    /// Get a route by ID.
    pub fn get(&self, id: &str) -> Result<Option<Route>> {
        self.storage.get(ROUTES_COLLECTION, id)
    }

    /// Create a new route.
    pub fn create(&self, record: &Route) -> Result<()> {
        self.storage.create(ROUTES_COLLECTION, record)
    }

    /// Replace a route record, sequence included.
    pub fn update(&self, record: &Route) -> Result<()> {
        self.storage.update(ROUTES_COLLECTION, record)
    }

    /// Delete a route and the sequence it owns.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.storage.delete(ROUTES_COLLECTION, id)
    }

    /// Convert routes stored in the old bare-id-array layout and add them to
    /// the routes collection. Routes already present by id, and routes for a
    /// weekday the driver already has a route on, are skipped.
    pub fn migrate_legacy(&self, legacy_collection: &str) -> Result<usize> {
        let legacy: Vec<LegacyRoute> = self.storage.list(legacy_collection)?;
        let mut migrated = 0;
        for record in legacy {
            if self.get(&record.id)?.is_some() {
                log::debug!("Route {} already migrated", record.id);
                continue;
            }
            let route = Route::from(record);
            if let Some(existing) = self.find_for_day(&route.driver_id, route.day_of_week)? {
                log::warn!(
                    "Skipping legacy route {}: driver {} already has route {} on {}",
                    route.id,
                    route.driver_id,
                    existing.id,
                    route.day_of_week
                );
                continue;
            }
            self.create(&route)?;
            migrated += 1;
        }
        log::info!("Migrated {} routes from {}", migrated, legacy_collection);
        Ok(migrated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Membership;
    use crate::storage::JsonlStorage;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_storage() -> (JsonlStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_create_and_get_route() {
        let (storage, _temp) = create_test_storage();
        let store = RouteStore::new(&storage);

        let mut route = Route::new("d1", DayOfWeek::Monday);
        route.append("s1", Membership::Simple).unwrap();
        route.append("s2", Membership::Simple).unwrap();
        store.create(&route).unwrap();

        let loaded = store.get(&route.id).unwrap().unwrap();
        assert_eq!(loaded.sequence.stop_ids(), vec!["s1", "s2"]);
    }

    #[test]
    fn test_find_for_day() {
        let (storage, _temp) = create_test_storage();
        let store = RouteStore::new(&storage);

        let monday = Route::new("d1", DayOfWeek::Monday);
        let tuesday = Route::new("d1", DayOfWeek::Tuesday);
        let other = Route::new("d2", DayOfWeek::Monday);
        store.create(&monday).unwrap();
        store.create(&tuesday).unwrap();
        store.create(&other).unwrap();

        let found = store.find_for_day("d1", DayOfWeek::Monday).unwrap().unwrap();
        assert_eq!(found.id, monday.id);
        assert!(store.find_for_day("d1", DayOfWeek::Sunday).unwrap().is_none());
        assert_eq!(store.find_by_driver("d1").unwrap().len(), 2);
    }

    #[test]
    fn test_find_for_day_reads_short_day_names() {
        let (storage, temp) = create_test_storage();
        fs::write(
            temp.path().join("routes.jsonl"),
            r#"{"id":"r1","driver_id":"d1","day_of_week":"Thu","route_stops":[],"created_at":0,"updated_at":0}"#,
        )
        .unwrap();

        let store = RouteStore::new(&storage);
        let found = store.find_for_day("d1", DayOfWeek::Thursday).unwrap();
        assert_eq!(found.map(|r| r.id), Some("r1".to_string()));
    }

    #[test]
    fn test_corrupt_sequence_fails_to_load() {
        let (storage, temp) = create_test_storage();
        fs::write(
            temp.path().join("routes.jsonl"),
            r#"{"id":"r1","driver_id":"d1","day_of_week":"Monday","route_stops":[{"stop_id":"s1","position":1}],"created_at":0,"updated_at":0}"#,
        )
        .unwrap();

        let store = RouteStore::new(&storage);
        assert!(store.get("r1").is_err());
    }

    #[test]
    fn test_migrate_legacy_routes() {
        let (storage, temp) = create_test_storage();
        fs::write(
            temp.path().join("legacy_routes.jsonl"),
            concat!(
                r#"{"id":"r1","driver_id":"d1","day_of_week":"Mon","stops":["s2","s1","s2"]}"#,
                "\n",
                r#"{"id":"r2","driver_id":"d1","day_of_week":"Friday"}"#,
                "\n"
            ),
        )
        .unwrap();

        let store = RouteStore::new(&storage);
        assert_eq!(store.migrate_legacy("legacy_routes").unwrap(), 2);
        assert_eq!(store.migrate_legacy("legacy_routes").unwrap(), 0);

        let r1 = store.get("r1").unwrap().unwrap();
        assert_eq!(r1.day_of_week, DayOfWeek::Monday);
        assert_eq!(r1.sequence.stop_ids(), vec!["s2", "s1"]);
        assert_eq!(r1.sequence.positions(), vec![0, 1]);
        assert!(r1.sequence.iter().all(|e| e.membership == Membership::Simple));
        assert!(store.get("r2").unwrap().unwrap().sequence.is_empty());
    }

    #[test]
    fn test_find_for_day_ignores_corrupt_route_on_other_day() {
        let (storage, temp) = create_test_storage();
        fs::write(
            temp.path().join("routes.jsonl"),
            concat!(
                r#"{"id":"r1","driver_id":"d1","day_of_week":"Monday","route_stops":[{"stop_id":"s1","position":0}],"created_at":0,"updated_at":0}"#,
                "\n",
                r#"{"id":"r2","driver_id":"d1","day_of_week":"Tue","route_stops":[{"stop_id":"s1","position":3}],"created_at":0,"updated_at":0}"#,
                "\n"
            ),
        )
        .unwrap();

        let store = RouteStore::new(&storage);
        let monday = store.find_for_day("d1", DayOfWeek::Monday).unwrap().unwrap();
        assert_eq!(monday.id, "r1");
        assert_eq!(monday.sequence.stop_ids(), vec!["s1"]);
        assert!(store.find_for_day("d1", DayOfWeek::Tuesday).is_err());
    }

    #[test]
    fn test_migrate_legacy_skips_second_route_for_same_day() {
        let (storage, temp) = create_test_storage();
        fs::write(
            temp.path().join("legacy_routes.jsonl"),
            concat!(
                r#"{"id":"r1","driver_id":"d1","day_of_week":"Mon","stops":["s1"]}"#,
                "\n",
                r#"{"id":"r2","driver_id":"d1","day_of_week":"Monday","stops":["s2"]}"#,
                "\n",
                r#"{"id":"r3","driver_id":"d2","day_of_week":"Monday","stops":["s3"]}"#,
                "\n"
            ),
        )
        .unwrap();

        let store = RouteStore::new(&storage);
        assert_eq!(store.migrate_legacy("legacy_routes").unwrap(), 2);

        let d1 = store.find_by_driver("d1").unwrap();
        assert_eq!(d1.len(), 1);
        assert_eq!(d1[0].id, "r1");
        assert!(store.get("r2").unwrap().is_none());
        assert!(store.get("r3").unwrap().is_some());
    }
}
