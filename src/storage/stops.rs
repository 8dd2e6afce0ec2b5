//! Stop-specific storage helpers.

use super::traits::{Filter, HasId, Storage};
use crate::domain::Stop;
use crate::error::Result;

/// Collection name for stops.
pub const STOPS_COLLECTION: &str = "stops";

impl HasId for Stop {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Helper for stop-specific queries.
pub struct StopStore<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> StopStore<'a, S> {
    /// Create a new StopStore wrapping the given storage.
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Find all stops assigned to a driver.
    pub fn find_by_driver(&self, driver_id: &str) -> Result<Vec<Stop>> {
        self.storage
            .query(STOPS_COLLECTION, &[Filter::eq("driver_id", driver_id)])
    }

    /// List all stops.
    pub fn list_all(&self) -> Result<Vec<Stop>> {
        self.storage.list(STOPS_COLLECTION)
    }

    /// Get a stop by ID.
    pub fn get(&self, id: &str) -> Result<Option<Stop>> {
        self.storage.get(STOPS_COLLECTION, id)
    }

    /// Create a new stop.
    pub fn create(&self, record: &Stop) -> Result<()> {
        self.storage.create(STOPS_COLLECTION, record)
    }

    /// Update an existing stop.
    pub fn update(&self, record: &Stop) -> Result<()> {
        self.storage.update(STOPS_COLLECTION, record)
    }

    /// Delete a stop.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.storage.delete(STOPS_COLLECTION, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DayOfWeek, Machine};
    use crate::storage::JsonlStorage;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn create_test_storage() -> (JsonlStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonlStorage::new(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    fn stop(name: &str, driver: &str, days: &[DayOfWeek]) -> Stop {
        Stop::new(name, driver, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .with_days(days)
            .with_machines(&[Machine::Soda])
    }

    #[test]
    fn test_create_and_get_stop() {
        let (storage, _temp) = create_test_storage();
        let store = StopStore::new(&storage);

        let record = stop("Library", "d1", &[DayOfWeek::Monday]);
        store.create(&record).unwrap();

        assert_eq!(store.get(&record.id).unwrap(), Some(record));
    }

    #[test]
    fn test_find_by_driver() {
        let (storage, _temp) = create_test_storage();
        let store = StopStore::new(&storage);

        store.create(&stop("A", "d1", &[DayOfWeek::Monday])).unwrap();
        store.create(&stop("B", "d2", &[DayOfWeek::Monday])).unwrap();
        store.create(&stop("C", "d1", &[DayOfWeek::Friday])).unwrap();

        let stops = store.find_by_driver("d1").unwrap();
        assert_eq!(stops.len(), 2);
        assert!(stops.iter().all(|s| s.driver_id == "d1"));
    }

    #[test]
    fn test_update_and_delete_stop() {
        let (storage, _temp) = create_test_storage();
        let store = StopStore::new(&storage);

        let mut record = stop("Library", "d1", &[DayOfWeek::Monday]);
        store.create(&record).unwrap();

        record.name = "City Library".to_string();
        store.update(&record).unwrap();
        assert_eq!(store.get(&record.id).unwrap().unwrap().name, "City Library");

        store.delete(&record.id).unwrap();
        assert!(store.get(&record.id).unwrap().is_none());
    }
}
