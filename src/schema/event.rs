//! Logged-entry payloads
//!
//! Each health metric is logged on its own, so the payload is a tagged union
//! with exactly the fields that metric needs. Numeric fields are optional:
//! forms send `0` or nothing for "not entered", and the normalizer treats
//! both the same way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;
use crate::types::{Frequency, Nutrition, TemperatureUnit};

/// One metric reading, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MetricEvent {
    BloodPressure {
        #[serde(default)]
        systolic: Option<f64>,
        #[serde(default)]
        diastolic: Option<f64>,
    },
    Pulse {
        #[serde(default)]
        pulse: Option<f64>,
    },
    Weight {
        #[serde(default)]
        weight: Option<f64>,
    },
    Temperature {
        #[serde(default)]
        temperature: Option<f64>,
        #[serde(default)]
        unit: TemperatureUnit,
    },
    Mood {
        #[serde(default)]
        mood: Option<String>,
    },
    Smoking {
        #[serde(default)]
        smoked: bool,
        #[serde(default, rename = "cigaretteCount")]
        cigarette_count: Option<u32>,
    },
    Pain {
        #[serde(default, rename = "painLevel")]
        pain_level: Option<f64>,
        #[serde(default)]
        notes: Option<String>,
    },
    Movement {
        #[serde(default, rename = "movementLevel")]
        movement_level: Option<String>,
    },
    Sport {
        #[serde(default)]
        sport: bool,
    },
}

impl MetricEvent {
    /// Metric kind name as used in the `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            MetricEvent::BloodPressure { .. } => "blood-pressure",
            MetricEvent::Pulse { .. } => "pulse",
            MetricEvent::Weight { .. } => "weight",
            MetricEvent::Temperature { .. } => "temperature",
            MetricEvent::Mood { .. } => "mood",
            MetricEvent::Smoking { .. } => "smoking",
            MetricEvent::Pain { .. } => "pain",
            MetricEvent::Movement { .. } => "movement",
            MetricEvent::Sport { .. } => "sport",
        }
    }
}

/// A logged health metric with optional identity and time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub event: MetricEvent,
}

impl LoggedEvent {
    /// Create an event stamped with the given time
    pub fn at(timestamp: DateTime<Utc>, event: MetricEvent) -> Self {
        Self {
            id: None,
            timestamp: Some(timestamp),
            event,
        }
    }

    /// Create an event that takes its time from the normalizer's clock
    pub fn now(event: MetricEvent) -> Self {
        Self {
            id: None,
            timestamp: None,
            event,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A logged meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nutrition: Nutrition,
}

/// A logged medication dose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub taken: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
