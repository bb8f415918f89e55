//! Record store
//!
//! Holds the three record collections (most recent first) on top of an
//! injected key-value persistence backend. Collections are read from the
//! backend by `load()` and written back by `flush()`; nothing is persisted
//! implicitly.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{JournalError, ValidationError};
use crate::normalizer::EntryNormalizer;
use crate::types::{Collection, FoodRecord, HealthRecord, MedicationRecord, RecordRef};

/// Key-value persistence boundary
pub trait KeyValueStore {
    /// Read the blob stored under `key`, if any
    fn load(&self, key: &str) -> Result<Option<String>, JournalError>;

    /// Replace the blob stored under `key`
    fn save(&mut self, key: &str, blob: &str) -> Result<(), JournalError>;
}

/// In-memory backend
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw blob stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, blob: impl Into<String>) {
        self.entries.insert(key.into(), blob.into());
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, JournalError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), JournalError> {
        self.entries.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

/// Directory backend: one `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, JournalError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), JournalError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, blob)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Read-only view over the three collections
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub foods: &'a [FoodRecord],
    pub health: &'a [HealthRecord],
    pub medications: &'a [MedicationRecord],
}

impl<'a> Snapshot<'a> {
    pub fn new(
        foods: &'a [FoodRecord],
        health: &'a [HealthRecord],
        medications: &'a [MedicationRecord],
    ) -> Self {
        Self {
            foods,
            health,
            medications,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty() && self.health.is_empty() && self.medications.is_empty()
    }

    pub fn len(&self) -> usize {
        self.foods.len() + self.health.len() + self.medications.len()
    }
}

/// Owner of the food, health and medication collections
pub struct RecordStore<S: KeyValueStore> {
    storage: S,
    foods: Vec<FoodRecord>,
    health: Vec<HealthRecord>,
    medications: Vec<MedicationRecord>,
}

impl<S: KeyValueStore> RecordStore<S> {
    /// Create an empty store; call `load()` to read persisted collections
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            foods: Vec::new(),
            health: Vec::new(),
            medications: Vec::new(),
        }
    }

    /// Replace the in-memory collections with the persisted ones.
    ///
    /// Health records without meaningful data are dropped on the way in.
    pub fn load(&mut self) -> Result<(), JournalError> {
        let stored_foods: Vec<FoodRecord> = self.load_collection(Collection::Food)?;
        let loaded: Vec<HealthRecord> = self.load_collection(Collection::Health)?;
        let medications: Vec<MedicationRecord> = self.load_collection(Collection::Medication)?;

        let total = stored_foods.len();
        let foods: Vec<FoodRecord> = stored_foods
            .into_iter()
            .filter(|r| EntryNormalizer::check_food(r).is_ok())
            .collect();
        if foods.len() < total {
            tracing::warn!(
                dropped = total - foods.len(),
                "dropped stored food records with invalid nutrients"
            );
        }

        let total = loaded.len();
        let health: Vec<HealthRecord> = loaded
            .into_iter()
            .map(HealthRecord::sanitized)
            .filter(|r| r.has_data() && EntryNormalizer::check_health(r).is_ok())
            .collect();
        if health.len() < total {
            tracing::warn!(
                dropped = total - health.len(),
                "dropped stored health records without valid data"
            );
        }

        self.foods = foods;
        self.health = health;
        self.medications = medications;

        tracing::info!(
            foods = self.foods.len(),
            health = self.health.len(),
            medications = self.medications.len(),
            "record store loaded"
        );
        Ok(())
    }

    /// Write all three collections to the backend
    pub fn flush(&mut self) -> Result<(), JournalError> {
        let foods = serde_json::to_string(&self.foods)?;
        let health = serde_json::to_string(&self.health)?;
        let medications = serde_json::to_string(&self.medications)?;

        self.storage.save(Collection::Food.storage_key(), &foods)?;
        self.storage.save(Collection::Health.storage_key(), &health)?;
        self.storage
            .save(Collection::Medication.storage_key(), &medications)?;

        tracing::debug!(records = self.snapshot().len(), "record store flushed");
        Ok(())
    }

    fn load_collection<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<T>, JournalError> {
        let key = collection.storage_key();
        match self.storage.load(key)? {
            None => Ok(Vec::new()),
            Some(blob) if blob.trim().is_empty() => Ok(Vec::new()),
            Some(blob) => serde_json::from_str(&blob)
                .map_err(|e| JournalError::Storage(format!("corrupt collection '{key}': {e}"))),
        }
    }

    pub fn add_food(&mut self, record: FoodRecord) {
        self.foods.insert(0, record);
    }

    /// Prepend a health record.
    ///
    /// Zero and half-filled fields are dropped first; records left without
    /// data, or with out-of-range values, are refused.
    pub fn add_health(&mut self, record: HealthRecord) -> Result<(), ValidationError> {
        let record = record.sanitized();
        if !record.has_data() {
            return Err(ValidationError::EmptyEntry("health"));
        }
        EntryNormalizer::check_health(&record)?;
        self.health.insert(0, record);
        Ok(())
    }

    pub fn add_medication(&mut self, record: MedicationRecord) {
        self.medications.insert(0, record);
    }

    /// Prepend a batch of records to each collection, keeping batch order
    pub(crate) fn prepend(
        &mut self,
        foods: Vec<FoodRecord>,
        health: Vec<HealthRecord>,
        medications: Vec<MedicationRecord>,
    ) {
        debug_assert!(health.iter().all(HealthRecord::has_data));
        debug_assert!(health.iter().all(|r| EntryNormalizer::check_health(r).is_ok()));
        self.foods.splice(0..0, foods);
        self.health.splice(0..0, health);
        self.medications.splice(0..0, medications);
    }

    /// Remove the first record matching `target`
    pub fn delete(&mut self, target: &RecordRef) -> Result<(), JournalError> {
        let removed = match target.collection {
            Collection::Food => remove_first(&mut self.foods, |r| r.id == target.id),
            Collection::Health => remove_first(&mut self.health, |r| r.id == target.id),
            Collection::Medication => remove_first(&mut self.medications, |r| r.id == target.id),
        };
        if removed {
            Ok(())
        } else {
            Err(JournalError::RecordNotFound(format!(
                "{}/{}",
                target.collection.as_str(),
                target.id
            )))
        }
    }

    pub fn foods(&self) -> &[FoodRecord] {
        &self.foods
    }

    pub fn health(&self) -> &[HealthRecord] {
        &self.health
    }

    pub fn medications(&self) -> &[MedicationRecord] {
        &self.medications
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot::new(&self.foods, &self.health, &self.medications)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

fn remove_first<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> bool {
    match items.iter().position(matches) {
        Some(index) => {
            items.remove(index);
            true
        }
        None => false,
    }
}
