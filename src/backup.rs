//! Backup export and import
//!
//! A backup is a single JSON object holding the three collections plus an
//! export date and a version tag. Import validates the whole payload before
//! touching the store, so a bad file never leaves a partial merge behind.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{JournalError, ValidationError};
use crate::normalizer::EntryNormalizer;
use crate::schema::{timestamp, SCHEMA_VERSION};
use crate::store::{KeyValueStore, RecordStore, Snapshot};
use crate::types::{Collection, FoodRecord, HealthRecord, MedicationRecord};

/// Backup file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPayload {
    pub food_entries: Vec<FoodRecord>,
    pub health_data: Vec<HealthRecord>,
    pub medications: Vec<MedicationRecord>,
    #[serde(with = "timestamp")]
    pub export_date: DateTime<Utc>,
    pub version: String,
}

impl BackupPayload {
    /// Pretty-printed JSON, as written to backup files
    pub fn to_json(&self) -> Result<String, JournalError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Counts of what an import added
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub foods: usize,
    pub health: usize,
    pub medications: usize,
    /// Imported health records dropped because they carried no data
    pub skipped_empty: usize,
    /// Version tag of the imported file
    pub version: String,
}

impl MergeResult {
    pub fn total(&self) -> usize {
        self.foods + self.health + self.medications
    }
}

/// Backup export / import
pub struct BackupMerger;

impl BackupMerger {
    /// Copy every record into a backup payload
    pub fn export(snapshot: &Snapshot<'_>, now: DateTime<Utc>) -> BackupPayload {
        BackupPayload {
            food_entries: snapshot.foods.to_vec(),
            health_data: snapshot.health.to_vec(),
            medications: snapshot.medications.to_vec(),
            export_date: now,
            version: SCHEMA_VERSION.to_string(),
        }
    }

    /// Validate a backup file and prepend its records to the store.
    ///
    /// Records are not de-duplicated: importing the same file twice yields
    /// two copies of every record.
    pub fn merge_import<S: KeyValueStore>(
        store: &mut RecordStore<S>,
        json: &str,
    ) -> Result<MergeResult, JournalError> {
        let root: Value = serde_json::from_str(json)
            .map_err(|e| JournalError::InvalidFormat(format!("not valid JSON: {e}")))?;
        let object = root
            .as_object()
            .ok_or_else(|| JournalError::InvalidFormat("expected a JSON object".to_string()))?;

        let version = match object.get("version") {
            Some(Value::String(version)) => version.clone(),
            Some(_) => {
                return Err(JournalError::InvalidFormat(
                    "'version' must be a string".to_string(),
                ))
            }
            None => return Err(JournalError::InvalidFormat("missing 'version'".to_string())),
        };

        let foods: Vec<FoodRecord> = collection(object, Collection::Food)?;
        let loaded: Vec<HealthRecord> = collection(object, Collection::Health)?;
        let medications: Vec<MedicationRecord> = collection(object, Collection::Medication)?;

        for (index, record) in foods.iter().enumerate() {
            EntryNormalizer::check_food(record)
                .map_err(|e| out_of_range(Collection::Food, index, e))?;
        }

        let total = loaded.len();
        let mut health = Vec::with_capacity(total);
        for (index, record) in loaded.into_iter().enumerate() {
            let record = record.sanitized();
            EntryNormalizer::check_health(&record)
                .map_err(|e| out_of_range(Collection::Health, index, e))?;
            if record.has_data() {
                health.push(record);
            }
        }
        let skipped_empty = total - health.len();
        if skipped_empty > 0 {
            tracing::warn!(skipped_empty, "skipped imported health records without data");
        }

        let result = MergeResult {
            foods: foods.len(),
            health: health.len(),
            medications: medications.len(),
            skipped_empty,
            version,
        };

        store.prepend(foods, health, medications);

        tracing::info!(
            foods = result.foods,
            health = result.health,
            medications = result.medications,
            version = %result.version,
            "backup merged"
        );
        Ok(result)
    }
}

fn out_of_range(collection: Collection, index: usize, error: ValidationError) -> JournalError {
    JournalError::InvalidFormat(format!(
        "bad record {index} in '{}': {error}",
        collection.storage_key()
    ))
}

fn collection<T: DeserializeOwned>(
    object: &Map<String, Value>,
    collection: Collection,
) -> Result<Vec<T>, JournalError> {
    let key = collection.storage_key();
    match object.get(key) {
        Some(value @ Value::Array(_)) => Vec::<T>::deserialize(value)
            .map_err(|e| JournalError::InvalidFormat(format!("bad record in '{key}': {e}"))),
        Some(_) => Err(JournalError::InvalidFormat(format!("'{key}' must be an array"))),
        None => Err(JournalError::InvalidFormat(format!("missing '{key}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{Frequency, Mood, Nutrition};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn seeded_store() -> RecordStore<MemoryStore> {
        let mut store = RecordStore::new(MemoryStore::new());
        store.add_food(FoodRecord {
            id: "f1".to_string(),
            description: "Soup".to_string(),
            nutrition: Nutrition {
                calories: 240.0,
                foods: vec!["tomato".to_string()],
                ..Default::default()
            },
            timestamp: Utc.timestamp_nanos(1_705_300_000_123_456_789),
        });
        let mut mood = HealthRecord::new("h1", Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());
        mood.mood = Some(Mood::Stressed);
        store.add_health(mood).unwrap();
        store.add_medication(MedicationRecord {
            id: "m1".to_string(),
            name: "Ibuprofen".to_string(),
            dosage: "200mg".to_string(),
            frequency: Frequency::AsNeeded,
            taken: false,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
            notes: Some("after lunch".to_string()),
        });
        store
    }

    #[test]
    fn test_export_then_import_doubles_collections() {
        let mut store = seeded_store();
        let original_foods = store.foods().to_vec();
        let original_health = store.health().to_vec();
        let original_meds = store.medications().to_vec();

        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let json = BackupMerger::export(&store.snapshot(), now).to_json().unwrap();
        let result = BackupMerger::merge_import(&mut store, &json).unwrap();

        assert_eq!(result.total(), 3);
        assert_eq!(result.version, SCHEMA_VERSION);
        assert_eq!(store.foods().len(), 2);
        assert_eq!(store.health().len(), 2);
        assert_eq!(store.medications().len(), 2);

        // imported copies come first, originals follow unchanged
        assert_eq!(&store.foods()[..1], original_foods.as_slice());
        assert_eq!(&store.foods()[1..], original_foods.as_slice());
        assert_eq!(&store.health()[1..], original_health.as_slice());
        assert_eq!(&store.medications()[..1], original_meds.as_slice());
    }

    #[test]
    fn test_export_uses_backup_field_names() {
        let store = seeded_store();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let value = serde_json::to_value(BackupMerger::export(&store.snapshot(), now)).unwrap();

        assert!(value["foodEntries"].is_array());
        assert!(value["healthData"].is_array());
        assert!(value["medications"].is_array());
        assert_eq!(value["exportDate"], "2024-02-01T00:00:00Z");
        assert_eq!(value["version"], SCHEMA_VERSION);
    }

    #[test]
    fn test_missing_collection_leaves_store_untouched() {
        let mut store = seeded_store();
        let before = store.snapshot().len();

        let json = r#"{"foodEntries": [], "healthData": [], "version": "1.0"}"#;
        let err = BackupMerger::merge_import(&mut store, json).unwrap_err();

        assert!(matches!(err, JournalError::InvalidFormat(ref m) if m.contains("medications")));
        assert_eq!(store.snapshot().len(), before);
    }

    #[test]
    fn test_structural_checks() {
        let mut store = RecordStore::new(MemoryStore::new());
        let cases = [
            "not json",
            "[]",
            r#"{"foodEntries": [], "healthData": [], "medications": []}"#,
            r#"{"foodEntries": [], "healthData": [], "medications": [], "version": 1}"#,
            r#"{"foodEntries": {}, "healthData": [], "medications": [], "version": "1.0"}"#,
        ];
        for json in cases {
            let result = BackupMerger::merge_import(&mut store, json);
            assert!(
                matches!(result, Err(JournalError::InvalidFormat(_))),
                "accepted: {json}"
            );
        }
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_bad_record_rejects_whole_file() {
        let mut store = RecordStore::new(MemoryStore::new());
        let json = r#"{
            "foodEntries": [{"id": "ok", "description": "Tea", "nutrition": {},
                             "timestamp": "2024-01-15T08:00:00Z"}],
            "healthData": [{"id": "bad"}],
            "medications": [],
            "version": "1.0"
        }"#;

        assert!(BackupMerger::merge_import(&mut store, json).is_err());
        assert!(store.foods().is_empty());
    }

    #[test]
    fn test_out_of_range_values_reject_whole_file() {
        let cases = [
            r#"{"foodEntries": [], "medications": [], "version": "1.0",
                "healthData": [{"id": "p", "timestamp": "2024-01-15T08:00:00Z",
                                "painLevel": 50}]}"#,
            r#"{"foodEntries": [], "medications": [], "version": "1.0",
                "healthData": [{"id": "v", "timestamp": "2024-01-15T08:00:00Z", "pulse": 900}]}"#,
            r#"{"healthData": [], "medications": [], "version": "1.0",
                "foodEntries": [{"id": "f", "description": "Soup", "nutrition": {"calories": -500},
                                 "timestamp": "2024-01-15T08:00:00Z"}]}"#,
        ];
        for json in cases {
            let mut store = seeded_store();
            let before = store.snapshot().len();
            let result = BackupMerger::merge_import(&mut store, json);
            assert!(
                matches!(result, Err(JournalError::InvalidFormat(_))),
                "accepted: {json}"
            );
            assert_eq!(store.snapshot().len(), before);
        }
    }

    #[test]
    fn test_legacy_millis_timestamps_and_empty_rows() {
        let mut store = RecordStore::new(MemoryStore::new());
        let json = r#"{
            "foodEntries": [],
            "healthData": [
                {"id": "a", "timestamp": 1705307400000, "pulse": 64},
                {"id": "b", "timestamp": 1705307500000, "weight": 0, "smoked": false}
            ],
            "medications": [
                {"id": "m", "name": "Iron", "dosage": "", "frequency": "every-other-day",
                 "taken": true, "timestamp": 1705307600000}
            ],
            "exportDate": 1705307700000,
            "version": "0.9"
        }"#;

        let result = BackupMerger::merge_import(&mut store, json).unwrap();
        assert_eq!(result.health, 1);
        assert_eq!(result.skipped_empty, 1);
        assert_eq!(result.version, "0.9");
        assert_eq!(
            store.health()[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap()
        );
        assert_eq!(store.medications()[0].frequency, Frequency::Other);
    }

    #[test]
    fn test_import_preserves_internal_order() {
        let mut store = seeded_store();
        let json = r#"{
            "foodEntries": [
                {"id": "n1", "description": "A", "nutrition": {},
                 "timestamp": "2024-01-20T08:00:00Z"},
                {"id": "n2", "description": "B", "nutrition": {},
                 "timestamp": "2024-01-19T08:00:00Z"}
            ],
            "healthData": [],
            "medications": [],
            "version": "1.0"
        }"#;

        BackupMerger::merge_import(&mut store, json).unwrap();
        let ids: Vec<&str> = store.foods().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2", "f1"]);
    }
}
