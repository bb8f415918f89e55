//! Entry normalization
//!
//! This module turns logged-entry payloads into canonical records.
//! - Only the fields of the logged metric are extracted
//! - Zero or empty values count as "not entered"
//! - Out-of-range values reject the whole entry
//! - Blood pressure is accepted only as a complete pair
//! - Temperatures are stored in Celsius

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::schema::{FoodEvent, LoggedEvent, MedicationEvent, MetricEvent};
use crate::types::{
    BloodPressure, FoodRecord, Frequency, HealthRecord, MedicationRecord, Mood, MovementLevel,
    Nutrition,
};

/// Accepted systolic pressure (mmHg)
pub const SYSTOLIC_MMHG: RangeInclusive<f64> = 70.0..=250.0;
/// Accepted diastolic pressure (mmHg)
pub const DIASTOLIC_MMHG: RangeInclusive<f64> = 40.0..=150.0;
/// Accepted pulse (bpm)
pub const PULSE_BPM: RangeInclusive<f64> = 30.0..=220.0;
/// Accepted body weight (kg)
pub const WEIGHT_KG: RangeInclusive<f64> = 20.0..=300.0;
/// Accepted body temperature, after conversion (°C)
pub const TEMPERATURE_C: RangeInclusive<f64> = 30.0..=45.0;
/// Accepted pain level
pub const PAIN_LEVEL: RangeInclusive<f64> = 1.0..=10.0;

/// Normalizer for converting logged entries to stored records
pub struct EntryNormalizer;

impl EntryNormalizer {
    /// Normalize a metric event, stamping it with the current time if needed
    pub fn normalize(event: &LoggedEvent) -> Result<HealthRecord, ValidationError> {
        Self::normalize_at(event, Utc::now())
    }

    /// Normalize a metric event; `now` is used when the event has no timestamp
    pub fn normalize_at(
        event: &LoggedEvent,
        now: DateTime<Utc>,
    ) -> Result<HealthRecord, ValidationError> {
        let mut record = HealthRecord::new(
            record_id(event.id.as_deref()),
            event.timestamp.unwrap_or(now),
        );

        match &event.event {
            MetricEvent::BloodPressure {
                systolic,
                diastolic,
            } => {
                let systolic = entered("systolic", *systolic)?;
                let diastolic = entered("diastolic", *diastolic)?;
                record.blood_pressure = Some(match (systolic, diastolic) {
                    (None, None) => return Err(ValidationError::EmptyEntry("blood-pressure")),
                    (Some(_), None) => {
                        return Err(ValidationError::MissingPairedField {
                            field: "diastolic",
                            paired_with: "systolic",
                        })
                    }
                    (None, Some(_)) => {
                        return Err(ValidationError::MissingPairedField {
                            field: "systolic",
                            paired_with: "diastolic",
                        })
                    }
                    (Some(systolic), Some(diastolic)) => BloodPressure {
                        systolic: in_range("systolic", systolic, &SYSTOLIC_MMHG)?,
                        diastolic: in_range("diastolic", diastolic, &DIASTOLIC_MMHG)?,
                    },
                });
            }
            MetricEvent::Pulse { pulse } => {
                let pulse = entered("pulse", *pulse)?.ok_or(ValidationError::EmptyEntry("pulse"))?;
                record.pulse = Some(in_range("pulse", pulse, &PULSE_BPM)?);
            }
            MetricEvent::Weight { weight } => {
                let weight =
                    entered("weight", *weight)?.ok_or(ValidationError::EmptyEntry("weight"))?;
                record.weight = Some(in_range("weight", weight, &WEIGHT_KG)?);
            }
            MetricEvent::Temperature { temperature, unit } => {
                let value = entered("temperature", *temperature)?
                    .ok_or(ValidationError::EmptyEntry("temperature"))?;
                let celsius = unit.to_celsius(value);
                record.temperature = Some(in_range("temperature", celsius, &TEMPERATURE_C)?);
                record.temperature_unit = Some(*unit);
            }
            MetricEvent::Mood { mood } => {
                let label = non_empty(mood.as_deref()).ok_or(ValidationError::EmptyEntry("mood"))?;
                record.mood = Some(Mood::parse(label).ok_or_else(|| {
                    ValidationError::UnknownValue {
                        field: "mood",
                        value: label.to_string(),
                    }
                })?);
            }
            MetricEvent::Smoking {
                smoked,
                cigarette_count,
            } => match (smoked, cigarette_count) {
                (true, count) => {
                    record.smoked = Some(true);
                    record.cigarette_count = *count;
                }
                (false, None | Some(0)) => return Err(ValidationError::EmptyEntry("smoking")),
                (false, Some(count)) => {
                    return Err(ValidationError::Inconsistent(format!(
                        "{count} cigarettes logged but smoked is false"
                    )))
                }
            },
            MetricEvent::Pain { pain_level, notes } => {
                let level = entered("painLevel", *pain_level)?
                    .ok_or(ValidationError::EmptyEntry("pain"))?;
                if level.fract() != 0.0 {
                    return Err(ValidationError::Invalid {
                        field: "painLevel",
                        reason: format!("{level} is not a whole number"),
                    });
                }
                record.pain_level = Some(in_range("painLevel", level, &PAIN_LEVEL)? as u8);
                record.pain_notes = non_empty(notes.as_deref()).map(str::to_string);
            }
            MetricEvent::Movement { movement_level } => {
                let label = non_empty(movement_level.as_deref())
                    .ok_or(ValidationError::EmptyEntry("movement"))?;
                record.movement_level = Some(MovementLevel::parse(label).ok_or_else(|| {
                    ValidationError::UnknownValue {
                        field: "movementLevel",
                        value: label.to_string(),
                    }
                })?);
            }
            MetricEvent::Sport { sport } => {
                if !sport {
                    return Err(ValidationError::EmptyEntry("sport"));
                }
                record.sport = Some(true);
            }
        }

        debug_assert!(record.has_data());
        Ok(record)
    }

    /// Normalize a food entry
    pub fn normalize_food(
        event: &FoodEvent,
        now: DateTime<Utc>,
    ) -> Result<FoodRecord, ValidationError> {
        let foods: Vec<String> = event
            .nutrition
            .foods
            .iter()
            .filter_map(|f| non_empty(Some(f.as_str())))
            .map(str::to_string)
            .collect();

        let description = match non_empty(Some(event.description.as_str())) {
            Some(description) => description.to_string(),
            None if !foods.is_empty() => foods.join(", "),
            None => return Err(ValidationError::EmptyEntry("food")),
        };

        let nutrition = &event.nutrition;
        let ingredients = match &nutrition.ingredients {
            Some(items) => {
                for item in items {
                    non_negative("ingredient.calories", item.calories)?;
                    non_negative("ingredient.carbs", item.carbs)?;
                    non_negative("ingredient.protein", item.protein)?;
                    non_negative("ingredient.fat", item.fat)?;
                }
                Some(items.clone())
            }
            None => None,
        };

        Ok(FoodRecord {
            id: record_id(event.id.as_deref()),
            description,
            nutrition: Nutrition {
                calories: non_negative("calories", nutrition.calories)?,
                carbs: non_negative("carbs", nutrition.carbs)?,
                protein: non_negative("protein", nutrition.protein)?,
                fat: non_negative("fat", nutrition.fat)?,
                foods,
                ingredients,
            },
            timestamp: event.timestamp.unwrap_or(now),
        })
    }

    /// Normalize a medication dose entry
    pub fn normalize_medication(
        event: &MedicationEvent,
        now: DateTime<Utc>,
    ) -> Result<MedicationRecord, ValidationError> {
        let name = non_empty(Some(event.name.as_str())).ok_or_else(|| ValidationError::Invalid {
            field: "name",
            reason: "medication name is required".to_string(),
        })?;

        Ok(MedicationRecord {
            id: record_id(event.id.as_deref()),
            name: name.to_string(),
            dosage: event.dosage.trim().to_string(),
            frequency: event.frequency.unwrap_or(Frequency::Other),
            taken: event.taken,
            timestamp: event.timestamp.unwrap_or(now),
            notes: non_empty(event.notes.as_deref()).map(str::to_string),
        })
    }

    /// Check a stored-form health record against the accepted ranges.
    ///
    /// Expects a sanitized record: absent fields are skipped, so zeros must
    /// already have been dropped.
    pub fn check_health(record: &HealthRecord) -> Result<(), ValidationError> {
        if let Some(bp) = record.blood_pressure {
            in_range("systolic", bp.systolic, &SYSTOLIC_MMHG)?;
            in_range("diastolic", bp.diastolic, &DIASTOLIC_MMHG)?;
        }
        if let Some(pulse) = record.pulse {
            in_range("pulse", pulse, &PULSE_BPM)?;
        }
        if let Some(weight) = record.weight {
            in_range("weight", weight, &WEIGHT_KG)?;
        }
        if let Some(temperature) = record.temperature {
            in_range("temperature", temperature, &TEMPERATURE_C)?;
        }
        if let Some(pain) = record.pain_level {
            in_range("painLevel", f64::from(pain), &PAIN_LEVEL)?;
        }
        Ok(())
    }

    /// Check a stored-form food record: every nutrient must be non-negative
    pub fn check_food(record: &FoodRecord) -> Result<(), ValidationError> {
        let nutrition = &record.nutrition;
        non_negative("calories", nutrition.calories)?;
        non_negative("carbs", nutrition.carbs)?;
        non_negative("protein", nutrition.protein)?;
        non_negative("fat", nutrition.fat)?;
        for item in nutrition.ingredients.iter().flatten() {
            non_negative("ingredient.calories", item.calories)?;
            non_negative("ingredient.carbs", item.carbs)?;
            non_negative("ingredient.protein", item.protein)?;
            non_negative("ingredient.fat", item.fat)?;
        }
        Ok(())
    }
}

fn record_id(id: Option<&str>) -> String {
    match non_empty(id) {
        Some(id) => id.to_string(),
        None => Uuid::new_v4().to_string(),
    }
}

/// Zero and missing both mean "not entered"
fn entered(field: &'static str, value: Option<f64>) -> Result<Option<f64>, ValidationError> {
    match value {
        None => Ok(None),
        Some(v) if v == 0.0 => Ok(None),
        Some(v) if !v.is_finite() => Err(ValidationError::Invalid {
            field,
            reason: "not a finite number".to_string(),
        }),
        Some(v) => Ok(Some(v)),
    }
}

fn in_range(
    field: &'static str,
    value: f64,
    range: &RangeInclusive<f64>,
) -> Result<f64, ValidationError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::Invalid {
            field,
            reason: format!("{value} must be a non-negative number"),
        })
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ingredient, TemperatureUnit};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap()
    }

    fn normalize(event: MetricEvent) -> Result<HealthRecord, ValidationError> {
        EntryNormalizer::normalize_at(&LoggedEvent::now(event), now())
    }

    fn bp(systolic: f64, diastolic: f64) -> MetricEvent {
        MetricEvent::BloodPressure {
            systolic: Some(systolic),
            diastolic: Some(diastolic),
        }
    }

    #[test]
    fn test_blood_pressure_pair_is_stored() {
        let record = normalize(bp(120.0, 80.0)).unwrap();
        assert_eq!(record.systolic(), Some(120.0));
        assert_eq!(record.diastolic(), Some(80.0));
        assert_eq!(record.timestamp, now());
        assert_eq!(record.pulse, None);
    }

    #[test]
    fn test_blood_pressure_without_diastolic_is_rejected() {
        let err = normalize(bp(120.0, 0.0)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingPairedField {
                field: "diastolic",
                paired_with: "systolic",
            }
        );

        let err = normalize(MetricEvent::BloodPressure {
            systolic: None,
            diastolic: Some(80.0),
        })
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingPairedField {
                field: "systolic",
                ..
            }
        ));
    }

    #[test]
    fn test_blood_pressure_range_bounds() {
        assert!(normalize(bp(70.0, 40.0)).is_ok());
        assert!(normalize(bp(250.0, 150.0)).is_ok());
        assert!(matches!(
            normalize(bp(69.0, 80.0)),
            Err(ValidationError::OutOfRange {
                field: "systolic",
                ..
            })
        ));
        assert!(matches!(
            normalize(bp(120.0, 151.0)),
            Err(ValidationError::OutOfRange {
                field: "diastolic",
                ..
            })
        ));
    }

    #[test]
    fn test_scalar_ranges() {
        assert!(normalize(MetricEvent::Pulse { pulse: Some(29.0) }).is_err());
        assert!(normalize(MetricEvent::Pulse { pulse: Some(220.0) }).is_ok());
        assert!(normalize(MetricEvent::Weight { weight: Some(19.9) }).is_err());
        assert!(normalize(MetricEvent::Weight { weight: Some(72.5) }).is_ok());
        assert!(normalize(MetricEvent::Weight { weight: Some(-70.0) }).is_err());
    }

    #[test]
    fn test_zero_values_are_empty_entries() {
        assert_eq!(
            normalize(MetricEvent::Weight { weight: Some(0.0) }).unwrap_err(),
            ValidationError::EmptyEntry("weight")
        );
        assert_eq!(
            normalize(MetricEvent::Pulse { pulse: None }).unwrap_err(),
            ValidationError::EmptyEntry("pulse")
        );
        assert_eq!(
            normalize(MetricEvent::Sport { sport: false }).unwrap_err(),
            ValidationError::EmptyEntry("sport")
        );
        assert_eq!(
            normalize(MetricEvent::Mood {
                mood: Some("  ".to_string())
            })
            .unwrap_err(),
            ValidationError::EmptyEntry("mood")
        );
    }

    #[test]
    fn test_fahrenheit_is_stored_as_celsius() {
        let record = normalize(MetricEvent::Temperature {
            temperature: Some(98.6),
            unit: TemperatureUnit::Fahrenheit,
        })
        .unwrap();
        assert!((record.temperature.unwrap() - 37.0).abs() < 0.001);
        assert_eq!(record.temperature_unit, Some(TemperatureUnit::Fahrenheit));

        // 98.6 read as Celsius is out of range
        assert!(normalize(MetricEvent::Temperature {
            temperature: Some(98.6),
            unit: TemperatureUnit::Celsius,
        })
        .is_err());
    }

    #[test]
    fn test_mood_and_movement_labels() {
        let record = normalize(MetricEvent::Mood {
            mood: Some("Tired".to_string()),
        })
        .unwrap();
        assert_eq!(record.mood, Some(Mood::Tired));

        assert!(matches!(
            normalize(MetricEvent::Movement {
                movement_level: Some("running".to_string())
            }),
            Err(ValidationError::UnknownValue {
                field: "movementLevel",
                ..
            })
        ));
    }

    #[test]
    fn test_smoking_rules() {
        let record = normalize(MetricEvent::Smoking {
            smoked: true,
            cigarette_count: Some(5),
        })
        .unwrap();
        assert_eq!(record.smoked, Some(true));
        assert_eq!(record.cigarette_count, Some(5));

        assert_eq!(
            normalize(MetricEvent::Smoking {
                smoked: false,
                cigarette_count: None,
            })
            .unwrap_err(),
            ValidationError::EmptyEntry("smoking")
        );
        assert!(matches!(
            normalize(MetricEvent::Smoking {
                smoked: false,
                cigarette_count: Some(2),
            }),
            Err(ValidationError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_pain_level_rules() {
        let record = normalize(MetricEvent::Pain {
            pain_level: Some(6.0),
            notes: Some(" lower back ".to_string()),
        })
        .unwrap();
        assert_eq!(record.pain_level, Some(6));
        assert_eq!(record.pain_notes.as_deref(), Some("lower back"));

        assert!(normalize(MetricEvent::Pain {
            pain_level: Some(11.0),
            notes: None,
        })
        .is_err());
        assert!(normalize(MetricEvent::Pain {
            pain_level: Some(2.5),
            notes: None,
        })
        .is_err());
        assert_eq!(
            normalize(MetricEvent::Pain {
                pain_level: None,
                notes: Some("just a note".to_string()),
            })
            .unwrap_err(),
            ValidationError::EmptyEntry("pain")
        );
    }

    #[test]
    fn test_ids_are_kept_or_generated() {
        let event = LoggedEvent::now(MetricEvent::Pulse { pulse: Some(64.0) }).with_id("p-1");
        assert_eq!(EntryNormalizer::normalize_at(&event, now()).unwrap().id, "p-1");

        let a = normalize(MetricEvent::Pulse { pulse: Some(64.0) }).unwrap();
        let b = normalize(MetricEvent::Pulse { pulse: Some(64.0) }).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_food_normalization() {
        let event = FoodEvent {
            id: None,
            timestamp: None,
            description: "  ".to_string(),
            nutrition: Nutrition {
                calories: 450.0,
                carbs: 60.0,
                protein: 20.0,
                fat: 12.0,
                foods: vec!["oatmeal".to_string(), " ".to_string(), "banana".to_string()],
                ingredients: Some(vec![Ingredient {
                    ingredient: "oats".to_string(),
                    amount: "80g".to_string(),
                    calories: 300.0,
                    carbs: 54.0,
                    protein: 10.0,
                    fat: 5.0,
                }]),
            },
        };

        let record = EntryNormalizer::normalize_food(&event, now()).unwrap();
        assert_eq!(record.description, "oatmeal, banana");
        assert_eq!(record.nutrition.foods.len(), 2);
        assert_eq!(record.timestamp, now());
    }

    #[test]
    fn test_food_rejects_negative_and_empty() {
        let mut event = FoodEvent {
            id: None,
            timestamp: None,
            description: "Soup".to_string(),
            nutrition: Nutrition {
                calories: -10.0,
                ..Default::default()
            },
        };
        assert!(EntryNormalizer::normalize_food(&event, now()).is_err());

        event.description = String::new();
        event.nutrition.calories = 10.0;
        assert_eq!(
            EntryNormalizer::normalize_food(&event, now()).unwrap_err(),
            ValidationError::EmptyEntry("food")
        );
    }

    #[test]
    fn test_medication_normalization() {
        let event = MedicationEvent {
            id: None,
            timestamp: None,
            name: " Metformin ".to_string(),
            dosage: "500mg".to_string(),
            frequency: Some(Frequency::TwiceDaily),
            taken: true,
            notes: Some(String::new()),
        };
        let record = EntryNormalizer::normalize_medication(&event, now()).unwrap();
        assert_eq!(record.name, "Metformin");
        assert_eq!(record.frequency, Frequency::TwiceDaily);
        assert_eq!(record.notes, None);

        let unnamed = MedicationEvent {
            name: String::new(),
            ..event
        };
        assert!(EntryNormalizer::normalize_medication(&unnamed, now()).is_err());
    }

    #[test]
    fn test_check_stored_records() {
        let mut record = HealthRecord::new("h1", now());
        record.pulse = Some(72.0);
        record.pain_level = Some(4);
        assert!(EntryNormalizer::check_health(&record).is_ok());

        record.pain_level = Some(50);
        assert!(matches!(
            EntryNormalizer::check_health(&record),
            Err(ValidationError::OutOfRange { field: "painLevel", .. })
        ));

        record.pain_level = None;
        record.pulse = Some(900.0);
        assert!(EntryNormalizer::check_health(&record).is_err());

        let food = FoodRecord {
            id: "f1".to_string(),
            description: "Soup".to_string(),
            nutrition: Nutrition {
                calories: -500.0,
                ..Default::default()
            },
            timestamp: now(),
        };
        assert!(EntryNormalizer::check_food(&food).is_err());
    }
}
