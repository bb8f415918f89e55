//! Synheart Journal - On-device health journal engine
//!
//! Journal turns logged food, vitals, medication and symptom entries into
//! sparse canonical records and serves everything a journal front-end needs
//! from them: normalization → storage → windowed rollups → observation
//! tables → backup export and merge.
//!
//! ## Modules
//!
//! - **Entry pipeline**: validate and normalize logged entries into records
//! - **Rollups**: per-window averages, distributions and weekly trends
//! - **Tables and backups**: row-per-observation projection, CSV, JSON backups

pub mod aggregate;
pub mod backup;
pub mod config;
pub mod encoder;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod projection;
pub mod schema;
pub mod store;
pub mod types;

pub use aggregate::{Aggregator, RollupSummary, Window};
pub use backup::{BackupMerger, BackupPayload, MergeResult};
pub use config::JournalConfig;
pub use error::{JournalError, ValidationError};
pub use normalizer::EntryNormalizer;
pub use pipeline::{normalize_event_json, summarize_json, HealthJournal};
pub use projection::{ObservationRow, Projection, RowFilter, SortOverride};
pub use store::{FileStore, KeyValueStore, MemoryStore, RecordStore, Snapshot};

// Schema exports
pub use schema::{FoodEvent, LoggedEvent, MedicationEvent, MetricEvent, SCHEMA_VERSION};

/// Journal version embedded in analysis requests
pub const JOURNAL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for analysis requests
pub const PRODUCER_NAME: &str = "synheart-journal";
