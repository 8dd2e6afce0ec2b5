//! JSONL-based storage implementation with in-memory caching.
//!
//! Each collection is one `<collection>.jsonl` file. Creates append a line;
//! updates and deletes rewrite the whole file through a temp file and rename,
//! so a record is either fully replaced on disk or not at all.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Serialize, de::DeserializeOwned};

use super::traits::{Filter, HasId, Storage};
use crate::error::{Result, RoutebookError};

type Collections = HashMap<String, Vec<serde_json::Value>>;

/// JSONL-based storage with in-memory caching.
pub struct JsonlStorage {
    base_path: PathBuf,
    cache: RwLock<Collections>,
}

impl std::fmt::Debug for JsonlStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlStorage")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> RoutebookError {
    RoutebookError::Storage(e.to_string())
}

fn record_id(record: &serde_json::Value) -> Option<&str> {
    record.get("id").and_then(|v| v.as_str())
}

impl JsonlStorage {
    /// Create a new JsonlStorage at the given path.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the file path for a collection.
    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", collection))
    }

    fn read_collection(&self, collection: &str) -> Result<Vec<serde_json::Value>> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(&line)?);
            }
        }
        log::debug!("Loaded {} records from {}", records.len(), path.display());
        Ok(records)
    }

    /// Load a collection into cache if not already loaded.
    fn ensure_loaded(&self, collection: &str) -> Result<()> {
        {
            let cache = self.cache.read().map_err(lock_err)?;
            if cache.contains_key(collection) {
                return Ok(());
            }
        }

        let mut cache = self.cache.write().map_err(lock_err)?;
        if cache.contains_key(collection) {
            return Ok(());
        }
        let records = self.read_collection(collection)?;
        cache.insert(collection.to_string(), records);
        Ok(())
    }

    /// Append a record to the JSONL file.
    fn append_to_file(&self, collection: &str, record: &serde_json::Value) -> Result<()> {
        let path = self.collection_path(collection);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    /// Replace the collection file with `records`.
    fn rewrite_file(&self, collection: &str, records: &[serde_json::Value]) -> Result<()> {
        let path = self.collection_path(collection);
        let tmp_path = self.base_path.join(format!(".{}.jsonl.tmp", collection));
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for record in records {
                writeln!(writer, "{}", serde_json::to_string(record)?)?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Apply `edit` to a copy of the collection, persist it, then swap it into
    /// the cache. The write lock is held throughout so concurrent edits of the
    /// same collection are serialized.
    fn edit_collection<F>(&self, collection: &str, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<serde_json::Value>) -> Result<()>,
    {
        self.ensure_loaded(collection)?;
        let mut cache = self.cache.write().map_err(lock_err)?;
        let current = cache
            .get(collection)
            .ok_or_else(|| RoutebookError::Storage(format!("Collection not loaded: {}", collection)))?;

        let mut next = current.clone();
        edit(&mut next)?;
        self.rewrite_file(collection, &next)?;
        cache.insert(collection.to_string(), next);
        Ok(())
    }
}

impl Storage for JsonlStorage {
    fn create<T: Serialize + DeserializeOwned + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        self.ensure_loaded(collection)?;

        let value = serde_json::to_value(record)?;
        let mut cache = self.cache.write().map_err(lock_err)?;
        let records = cache
            .get_mut(collection)
            .ok_or_else(|| RoutebookError::Storage(format!("Collection not loaded: {}", collection)))?;

        if records.iter().any(|r| record_id(r) == Some(record.id())) {
            return Err(RoutebookError::Storage(format!(
                "{} already contains a record with id {}",
                collection,
                record.id()
            )));
        }

        // Append to file first (source of truth)
        self.append_to_file(collection, &value)?;
        records.push(value);
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        self.ensure_loaded(collection)?;

        let cache = self.cache.read().map_err(lock_err)?;
        let records = cache
            .get(collection)
            .ok_or_else(|| RoutebookError::Storage(format!("Collection not loaded: {}", collection)))?;

        match records.iter().find(|r| record_id(r) == Some(id)) {
            Some(record) => Ok(Some(serde_json::from_value(record.clone())?)),
            None => Ok(None),
        }
    }

    fn update<T: Serialize + DeserializeOwned + HasId>(&self, collection: &str, record: &T) -> Result<()> {
        let value = serde_json::to_value(record)?;
        let id = record.id();

        self.edit_collection(collection, |records| {
            let slot = records
                .iter_mut()
                .find(|r| record_id(r) == Some(id))
                .ok_or_else(|| RoutebookError::NotFound(format!("{} record {}", collection, id)))?;
            *slot = value;
            Ok(())
        })
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.edit_collection(collection, |records| {
            let original_len = records.len();
            records.retain(|r| record_id(r) != Some(id));
            if records.len() == original_len {
                return Err(RoutebookError::NotFound(format!("{} record {}", collection, id)));
            }
            Ok(())
        })
    }

    fn query<T: DeserializeOwned>(&self, collection: &str, filters: &[Filter]) -> Result<Vec<T>> {
        self.ensure_loaded(collection)?;

        let cache = self.cache.read().map_err(lock_err)?;
        let records = cache
            .get(collection)
            .ok_or_else(|| RoutebookError::Storage(format!("Collection not loaded: {}", collection)))?;

        let mut results = Vec::new();
        for record in records {
            if filters.iter().all(|f| f.matches(record)) {
                results.push(serde_json::from_value(record.clone())?);
            }
        }
        Ok(results)
    }
}
