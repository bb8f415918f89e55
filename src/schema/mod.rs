//! Logged-entry input schema
//!
//! This module defines the payloads the journal accepts from the outside:
//! one tagged variant per health metric kind, plus food and medication
//! entries, and the timestamp codec shared by every stored record.

mod event;
pub mod timestamp;

pub use event::*;

/// Version tag written into backups and analysis requests
pub const SCHEMA_VERSION: &str = "1.0";
