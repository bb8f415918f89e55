//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Journal.
//! It wires logged entries through the normalizer into the record store, and
//! serves rollups, tables and backups from the stored collections.

use chrono::{DateTime, FixedOffset, Utc};

use crate::aggregate::{Aggregator, RollupSummary, Window};
use crate::backup::{BackupMerger, BackupPayload, MergeResult};
use crate::encoder::{AnalysisEncoder, AnalysisRequest};
use crate::error::JournalError;
use crate::normalizer::EntryNormalizer;
use crate::projection::{ObservationRow, Projection, RowFilter, SortOverride};
use crate::schema::{FoodEvent, LoggedEvent, MedicationEvent};
use crate::store::{KeyValueStore, MemoryStore, RecordStore};
use crate::types::{Collection, RecordRef};

/// Normalize one logged metric payload into a health record.
///
/// # Arguments
/// * `event_json` - A `LoggedEvent` payload, e.g. `{"type": "pulse", "pulse": 72}`
///
/// # Returns
/// The canonical record as JSON
///
/// # Example
/// ```ignore
/// let record_json = normalize_event_json(r#"{"type": "weight", "weight": 71.2}"#)?;
/// ```
pub fn normalize_event_json(event_json: &str) -> Result<String, JournalError> {
    let event: LoggedEvent = serde_json::from_str(event_json)?;
    let record = EntryNormalizer::normalize(&event)?;
    Ok(serde_json::to_string(&record)?)
}

/// Aggregate the records of a backup file without touching any store.
///
/// # Arguments
/// * `backup_json` - Backup file contents
/// * `window` - Aggregation window
/// * `now` - Reference time; its offset decides local dates
///
/// # Returns
/// The rollup as JSON
pub fn summarize_json(
    backup_json: &str,
    window: Window,
    now: DateTime<FixedOffset>,
) -> Result<String, JournalError> {
    let mut store = RecordStore::new(MemoryStore::new());
    BackupMerger::merge_import(&mut store, backup_json)?;
    let rollup = Aggregator::aggregate(&store.snapshot(), window, now);
    Ok(serde_json::to_string_pretty(&rollup)?)
}

/// Stateful journal over a persistence backend.
///
/// Mutations only change the in-memory collections; call `flush()` to
/// persist them.
pub struct HealthJournal<S: KeyValueStore> {
    store: RecordStore<S>,
}

impl<S: KeyValueStore> HealthJournal<S> {
    /// Create an empty journal without reading the backend
    pub fn new(storage: S) -> Self {
        Self {
            store: RecordStore::new(storage),
        }
    }

    /// Create a journal and load the persisted collections
    pub fn open(storage: S) -> Result<Self, JournalError> {
        let mut journal = Self::new(storage);
        journal.store.load()?;
        Ok(journal)
    }

    /// Normalize and store a health metric
    pub fn log_metric(
        &mut self,
        event: &LoggedEvent,
        now: DateTime<Utc>,
    ) -> Result<RecordRef, JournalError> {
        let record = EntryNormalizer::normalize_at(event, now).map_err(|e| {
            tracing::warn!(kind = event.event.kind(), error = %e, "rejected health entry");
            e
        })?;
        let reference = RecordRef::new(Collection::Health, record.id.as_str());
        self.store.add_health(record)?;
        tracing::debug!(kind = event.event.kind(), id = %reference.id, "health entry stored");
        Ok(reference)
    }

    /// Normalize and store a food entry
    pub fn log_food(
        &mut self,
        event: &FoodEvent,
        now: DateTime<Utc>,
    ) -> Result<RecordRef, JournalError> {
        let record = EntryNormalizer::normalize_food(event, now).map_err(|e| {
            tracing::warn!(error = %e, "rejected food entry");
            e
        })?;
        let reference = RecordRef::new(Collection::Food, record.id.as_str());
        self.store.add_food(record);
        tracing::debug!(id = %reference.id, "food entry stored");
        Ok(reference)
    }

    /// Normalize and store a medication dose
    pub fn log_medication(
        &mut self,
        event: &MedicationEvent,
        now: DateTime<Utc>,
    ) -> Result<RecordRef, JournalError> {
        let record = EntryNormalizer::normalize_medication(event, now).map_err(|e| {
            tracing::warn!(error = %e, "rejected medication entry");
            e
        })?;
        let reference = RecordRef::new(Collection::Medication, record.id.as_str());
        self.store.add_medication(record);
        tracing::debug!(id = %reference.id, "medication entry stored");
        Ok(reference)
    }

    pub fn delete(&mut self, target: &RecordRef) -> Result<(), JournalError> {
        self.store.delete(target)?;
        tracing::debug!(collection = target.collection.as_str(), id = %target.id, "record deleted");
        Ok(())
    }

    /// Rollup over `window`
    pub fn summary(&self, window: Window, now: DateTime<FixedOffset>) -> RollupSummary {
        Aggregator::aggregate(&self.store.snapshot(), window, now)
    }

    /// Observation table, filtered, in default or overridden order
    pub fn table(
        &self,
        offset: FixedOffset,
        filter: &RowFilter,
        sort: Option<SortOverride>,
    ) -> Vec<ObservationRow> {
        let rows = Projection::project(&self.store.snapshot(), offset);
        let mut rows = filter.apply(&rows);
        if sort.is_some() {
            Projection::sort(&mut rows, sort);
        }
        rows
    }

    /// Analysis request for the rollup over `window`
    pub fn analysis(
        &self,
        encoder: &AnalysisEncoder,
        window: Window,
        now: DateTime<FixedOffset>,
    ) -> Result<AnalysisRequest, JournalError> {
        encoder.encode(&self.summary(window, now))
    }

    pub fn export(&self, now: DateTime<Utc>) -> BackupPayload {
        BackupMerger::export(&self.store.snapshot(), now)
    }

    pub fn import(&mut self, backup_json: &str) -> Result<MergeResult, JournalError> {
        BackupMerger::merge_import(&mut self.store, backup_json)
    }

    /// Persist all collections
    pub fn flush(&mut self) -> Result<(), JournalError> {
        self.store.flush()
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::projection::{ObservationKind, SortColumn, SortDirection};
    use crate::schema::MetricEvent;
    use crate::types::Nutrition;
    use chrono::{Duration, TimeZone};

    fn local_now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 15, 18, 0, 0)
            .unwrap()
    }

    fn earlier(hours: i64) -> DateTime<Utc> {
        local_now().with_timezone(&Utc) - Duration::hours(hours)
    }

    fn pulse(value: f64) -> MetricEvent {
        MetricEvent::Pulse { pulse: Some(value) }
    }

    #[test]
    fn test_today_average_ignores_missing_fields() {
        let mut journal = HealthJournal::new(MemoryStore::new());
        let now = earlier(0);

        journal.log_metric(&LoggedEvent::at(earlier(3), pulse(70.0)), now).unwrap();
        let zero_weight = LoggedEvent::at(earlier(2), MetricEvent::Weight { weight: Some(0.0) });
        assert!(journal.log_metric(&zero_weight, now).is_err());
        journal.log_metric(&LoggedEvent::at(earlier(1), pulse(80.0)), now).unwrap();

        match journal.summary(Window::Today, local_now()) {
            RollupSummary::Window { summary, .. } => {
                assert_eq!(summary.vitals.pulse, Some(75.0));
                assert_eq!(summary.vitals.weight, None);
            }
            other => panic!("expected window rollup, got {other:?}"),
        }
    }

    #[test]
    fn test_half_blood_pressure_leaves_store_unchanged() {
        let mut journal = HealthJournal::new(MemoryStore::new());
        let event = LoggedEvent::now(MetricEvent::BloodPressure {
            systolic: Some(120.0),
            diastolic: Some(0.0),
        });

        let err = journal.log_metric(&event, earlier(0)).unwrap_err();
        assert!(matches!(
            err,
            JournalError::Validation(ValidationError::MissingPairedField { .. })
        ));
        assert!(journal.store().health().is_empty());
    }

    #[test]
    fn test_log_delete_and_table() {
        let mut journal = HealthJournal::new(MemoryStore::new());
        let now = earlier(0);

        let food = FoodEvent {
            id: None,
            timestamp: Some(earlier(5)),
            description: "Porridge".to_string(),
            nutrition: Nutrition {
                calories: 300.0,
                ..Default::default()
            },
        };
        let food_ref = journal.log_food(&food, now).unwrap();
        let bp = LoggedEvent::at(
            earlier(4),
            MetricEvent::BloodPressure {
                systolic: Some(118.0),
                diastolic: Some(76.0),
            },
        );
        journal.log_metric(&bp, now).unwrap();

        let rows = journal.table(FixedOffset::east_opt(0).unwrap(), &RowFilter::default(), None);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, ObservationKind::BloodPressure);
        assert_eq!(rows[1].source, food_ref);

        let by_type = journal.table(
            FixedOffset::east_opt(0).unwrap(),
            &RowFilter::default(),
            Some(SortOverride {
                column: SortColumn::Type,
                direction: SortDirection::Desc,
            }),
        );
        assert_eq!(by_type[0].kind, ObservationKind::Food);

        journal.delete(&food_ref).unwrap();
        assert!(journal.store().foods().is_empty());
        assert!(journal.delete(&food_ref).is_err());
    }

    #[test]
    fn test_medication_requires_name() {
        let mut journal = HealthJournal::new(MemoryStore::new());
        let event: MedicationEvent =
            serde_json::from_str(r#"{"name": "  ", "taken": true}"#).unwrap();
        assert!(journal.log_medication(&event, earlier(0)).is_err());

        let json = r#"{"name": "Vitamin D", "frequency": "once-daily", "taken": true}"#;
        let event: MedicationEvent = serde_json::from_str(json).unwrap();
        journal.log_medication(&event, earlier(0)).unwrap();
        assert_eq!(journal.store().medications().len(), 1);
    }

    #[test]
    fn test_flush_and_reopen() {
        let mut journal = HealthJournal::new(MemoryStore::new());
        journal
            .log_metric(&LoggedEvent::at(earlier(1), pulse(66.0)).with_id("p1"), earlier(0))
            .unwrap();
        journal.flush().unwrap();

        let reopened = HealthJournal::open(journal.store().storage().clone()).unwrap();
        assert_eq!(reopened.store().health().len(), 1);
        assert_eq!(reopened.store().health()[0].id, "p1");
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut journal = HealthJournal::new(MemoryStore::new());
        journal
            .log_metric(&LoggedEvent::at(earlier(1), pulse(66.0)), earlier(0))
            .unwrap();

        let json = journal.export(earlier(0)).to_json().unwrap();
        let result = journal.import(&json).unwrap();
        assert_eq!(result.health, 1);
        assert_eq!(journal.store().health().len(), 2);
        assert_eq!(journal.store().health()[0], journal.store().health()[1]);
    }

    #[test]
    fn test_analysis_of_empty_window_fails() {
        let journal = HealthJournal::new(MemoryStore::new());
        let encoder = AnalysisEncoder::new();
        assert!(journal.analysis(&encoder, Window::Last7Days, local_now()).is_err());
    }

    #[test]
    fn test_normalize_event_json() {
        let json = normalize_event_json(
            r#"{"type": "temperature", "temperature": 98.6, "unit": "fahrenheit",
                "timestamp": "2024-01-15T08:00:00Z", "id": "t1"}"#,
        )
        .unwrap();
        let record: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(record["id"], "t1");
        assert!((record["temperature"].as_f64().unwrap() - 37.0).abs() < 1e-9);
        assert_eq!(record["temperatureUnit"], "fahrenheit");
        assert!(record.get("pulse").is_none());

        assert!(normalize_event_json(r#"{"type": "pulse", "pulse": 400}"#).is_err());
        assert!(normalize_event_json("not json").is_err());
    }

    #[test]
    fn test_summarize_json() {
        let backup = r#"{
            "foodEntries": [],
            "healthData": [{"id": "a", "timestamp": "2024-01-15T08:00:00Z", "weight": 72.5}],
            "medications": [],
            "version": "1.0"
        }"#;

        let json = summarize_json(backup, Window::Last7Days, local_now()).unwrap();
        let rollup: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(rollup["kind"], "window");
        assert_eq!(rollup["summary"]["vitals"]["weight"], 72.5);

        let empty = summarize_json(backup, Window::Today, local_now() + Duration::days(3)).unwrap();
        assert!(empty.contains("\"empty\""));
    }
}
