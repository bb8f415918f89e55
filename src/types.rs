//! Core record types for Synheart Journal
//!
//! This module defines the three record kinds the journal persists (food,
//! health, medication), their enumerated fields, and the typed back-reference
//! used to address a single record across collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::timestamp;

/// Which collection a record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Food,
    Health,
    Medication,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Food => "food",
            Collection::Health => "health",
            Collection::Medication => "medication",
        }
    }

    /// Persistence key holding this collection
    pub fn storage_key(&self) -> &'static str {
        match self {
            Collection::Food => "foodEntries",
            Collection::Health => "healthData",
            Collection::Medication => "medications",
        }
    }
}

/// Typed reference to one stored record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub collection: Collection,
    pub id: String,
}

impl RecordRef {
    pub fn new(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }
}

/// One line of an ingredient breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub ingredient: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub fat: f64,
}

/// Nutrition payload of a food entry (grams for macronutrients)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub foods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<Ingredient>>,
}

/// A logged meal or snack. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodRecord {
    pub id: String,
    pub description: String,
    pub nutrition: Nutrition,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Self-reported mood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Excellent,
    Good,
    Neutral,
    Tired,
    Stressed,
    Unwell,
}

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Excellent,
        Mood::Good,
        Mood::Neutral,
        Mood::Tired,
        Mood::Stressed,
        Mood::Unwell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Excellent => "excellent",
            Mood::Good => "good",
            Mood::Neutral => "neutral",
            Mood::Tired => "tired",
            Mood::Stressed => "stressed",
            Mood::Unwell => "unwell",
        }
    }

    /// Parse a mood label, ignoring case and surrounding whitespace
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(label))
    }
}

/// How much the user moved during the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MovementLevel {
    MostlyLaying,
    Sitting,
    MoreWalking,
}

impl MovementLevel {
    pub const ALL: [MovementLevel; 3] = [
        MovementLevel::MostlyLaying,
        MovementLevel::Sitting,
        MovementLevel::MoreWalking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementLevel::MostlyLaying => "mostly-laying",
            MovementLevel::Sitting => "sitting",
            MovementLevel::MoreWalking => "more-walking",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MovementLevel::MostlyLaying => "Mostly laying",
            MovementLevel::Sitting => "Sitting",
            MovementLevel::MoreWalking => "More walking",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(label))
    }
}

/// Unit a temperature was entered in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    pub fn to_celsius(&self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        }
    }

    pub fn from_celsius(&self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }
}

/// Systolic/diastolic pair (mmHg). Only ever stored complete.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: f64,
    pub diastolic: f64,
}

/// Sparse health observation record.
///
/// Every metric field is optional and present only when it carries a
/// meaningful value. Temperatures are stored in Celsius; `temperature_unit`
/// only remembers how the value was entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    pub id: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<BloodPressure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_unit: Option<TemperatureUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cigarette_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pain_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pain_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement_level: Option<MovementLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport: Option<bool>,
}

impl HealthRecord {
    /// Create a record with no fields set
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            blood_pressure: None,
            pulse: None,
            weight: None,
            temperature: None,
            temperature_unit: None,
            mood: None,
            smoked: None,
            cigarette_count: None,
            pain_level: None,
            pain_notes: None,
            movement_level: None,
            sport: None,
        }
    }

    pub fn systolic(&self) -> Option<f64> {
        self.blood_pressure.map(|bp| bp.systolic)
    }

    pub fn diastolic(&self) -> Option<f64> {
        self.blood_pressure.map(|bp| bp.diastolic)
    }

    /// True when at least one field carries a meaningful value
    pub fn has_data(&self) -> bool {
        self.blood_pressure
            .is_some_and(|bp| positive(bp.systolic) && positive(bp.diastolic))
            || self.pulse.is_some_and(positive)
            || self.weight.is_some_and(positive)
            || self.temperature.is_some_and(positive)
            || self.mood.is_some()
            || self.smoked == Some(true)
            || self.pain_level.is_some_and(|p| p > 0)
            || self.movement_level.is_some()
            || self.sport == Some(true)
    }

    /// Drop zero-valued or half-populated fields.
    ///
    /// Used on records arriving from storage or backups, which may predate
    /// the normalizer's rules.
    pub fn sanitized(mut self) -> Self {
        self.blood_pressure = self
            .blood_pressure
            .filter(|bp| positive(bp.systolic) && positive(bp.diastolic));
        self.pulse = self.pulse.filter(|v| positive(*v));
        self.weight = self.weight.filter(|v| positive(*v));
        self.temperature = self.temperature.filter(|v| positive(*v));
        if self.temperature.is_none() {
            self.temperature_unit = None;
        }
        if self.smoked != Some(true) {
            self.smoked = None;
            self.cigarette_count = None;
        }
        self.pain_level = self.pain_level.filter(|p| *p > 0);
        if self.pain_level.is_none() {
            self.pain_notes = None;
        }
        self.pain_notes = self.pain_notes.filter(|n| !n.trim().is_empty());
        if self.sport != Some(true) {
            self.sport = None;
        }
        self
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Dosing schedule tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    OnceDaily,
    TwiceDaily,
    ThreeTimesDaily,
    FourTimesDaily,
    AsNeeded,
    Weekly,
    #[serde(other)]
    Other,
}

impl Frequency {
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::OnceDaily => "Once daily",
            Frequency::TwiceDaily => "Twice daily",
            Frequency::ThreeTimesDaily => "Three times daily",
            Frequency::FourTimesDaily => "Four times daily",
            Frequency::AsNeeded => "As needed",
            Frequency::Weekly => "Weekly",
            Frequency::Other => "Other",
        }
    }
}

/// One logged dose event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    pub frequency: Frequency,
    pub taken: bool,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
