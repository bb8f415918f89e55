//! Analysis request encoding
//!
//! This module turns an aggregated rollup into the request payload handed to
//! the external analysis service. Only aggregated values reach the payload;
//! individual records never leave the device through this path.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{RollupSummary, Trend, Window, WindowSummary};
use crate::error::JournalError;
use crate::schema::SCHEMA_VERSION;
use crate::{JOURNAL_VERSION, PRODUCER_NAME};

const INSTRUCTIONS: &str = "You are reviewing aggregated entries from a personal health journal. \
Summarize notable patterns and offer general wellness suggestions. \
Do not provide a diagnosis.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Payload sent to the analysis service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub schema_version: String,
    pub producer: Producer,
    pub computed_at_utc: String,
    pub window: Window,
    pub summary: RollupSummary,
    pub prompt: String,
}

/// Encoder for analysis requests
pub struct AnalysisEncoder {
    instance_id: String,
}

impl Default for AnalysisEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode a rollup; an empty rollup has nothing to analyze
    pub fn encode(&self, summary: &RollupSummary) -> Result<AnalysisRequest, JournalError> {
        let prompt = match summary {
            RollupSummary::Empty { window } => {
                return Err(JournalError::EncodingError(format!(
                    "no entries in window '{}'",
                    window.as_str()
                )))
            }
            RollupSummary::Window { summary, .. } => {
                format!("{}\n\n{}", INSTRUCTIONS, describe(summary).join("\n"))
            }
            RollupSummary::Weekly {
                buckets,
                weight_trend,
                ..
            } => {
                let mut sections = vec![INSTRUCTIONS.to_string()];
                for bucket in buckets.iter().filter(|b| !b.is_empty()) {
                    sections.push(format!("{}:\n{}", bucket.label, describe(bucket).join("\n")));
                }
                if let Some(trend) = weight_trend {
                    sections.push(format!("Weight trend over 30 days: {}", trend_label(*trend)));
                }
                sections.join("\n\n")
            }
        };

        Ok(AnalysisRequest {
            schema_version: SCHEMA_VERSION.to_string(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: JOURNAL_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            window: summary.window(),
            summary: summary.clone(),
            prompt,
        })
    }

    /// Encode to JSON string
    pub fn encode_to_json(&self, summary: &RollupSummary) -> Result<String, JournalError> {
        let request = self.encode(summary)?;
        serde_json::to_string_pretty(&request).map_err(JournalError::JsonError)
    }
}

fn trend_label(trend: Trend) -> &'static str {
    match trend {
        Trend::Increasing => "increasing",
        Trend::Decreasing => "decreasing",
        Trend::Stable => "stable",
    }
}

fn describe(s: &WindowSummary) -> Vec<String> {
    let mut lines = vec![format!("Period: {} to {}", s.start_date, s.end_date)];

    let n = &s.nutrition;
    if n.entries > 0 {
        let mut line = format!(
            "Food: {} entries, {:.0} kcal total, carbs {:.0} g, protein {:.0} g, fat {:.0} g",
            n.entries, n.calories, n.carbs, n.protein, n.fat
        );
        if let Some(avg) = n.avg_daily_calories {
            line.push_str(&format!(", {avg:.0} kcal per logged day"));
        }
        lines.push(line);
    }

    let v = &s.vitals;
    if let (Some(sys), Some(dia)) = (v.systolic, v.diastolic) {
        lines.push(format!("Average blood pressure: {sys:.0}/{dia:.0} mmHg"));
    }
    if let Some(pulse) = v.pulse {
        lines.push(format!("Average pulse: {pulse:.0} bpm"));
    }
    if let Some(weight) = v.weight {
        lines.push(format!("Average weight: {weight:.1} kg"));
    }
    if let Some(temperature) = v.temperature {
        lines.push(format!("Average temperature: {temperature:.1} °C"));
    }

    if !s.mood.is_empty() {
        let moods: Vec<String> = s
            .mood
            .iter()
            .map(|(mood, count)| format!("{} x{count}", mood.as_str()))
            .collect();
        lines.push(format!("Mood: {}", moods.join(", ")));
    }
    if s.smoking.smoking_days > 0 {
        lines.push(format!(
            "Smoking: {} cigarettes over {} days",
            s.smoking.cigarettes, s.smoking.smoking_days
        ));
    }
    if let (Some(avg), Some(max)) = (s.pain.average, s.pain.max) {
        lines.push(format!("Pain: average {avg:.1}/10, worst {max}/10"));
    }
    if !s.movement.is_empty() {
        let levels: Vec<String> = s
            .movement
            .iter()
            .map(|(level, count)| format!("{} x{count}", level.label()))
            .collect();
        lines.push(format!("Movement: {}", levels.join(", ")));
    }
    if s.sport_days > 0 {
        lines.push(format!("Days with sport: {}", s.sport_days));
    }
    if let Some(adherence) = s.medication.adherence {
        lines.push(format!(
            "Medication: {} of {} doses taken ({:.0}%)",
            s.medication.doses_taken,
            s.medication.doses_logged,
            adherence * 100.0
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::store::Snapshot;
    use crate::types::{Frequency, HealthRecord, MedicationRecord, Mood};
    use chrono::{Duration, FixedOffset, TimeZone};

    fn rollup(window: Window) -> RollupSummary {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 31, 12, 0, 0)
            .unwrap();
        let ts = now.with_timezone(&Utc) - Duration::hours(1);

        let mut record = HealthRecord::new("h1", ts);
        record.pulse = Some(68.0);
        record.mood = Some(Mood::Neutral);
        let health = vec![record];
        let meds = vec![MedicationRecord {
            id: "m1".to_string(),
            name: "Metformin".to_string(),
            dosage: "500mg".to_string(),
            frequency: Frequency::TwiceDaily,
            taken: true,
            timestamp: ts,
            notes: None,
        }];
        Aggregator::aggregate(&Snapshot::new(&[], &health, &meds), window, now)
    }

    #[test]
    fn test_encode_analysis_request() {
        let encoder = AnalysisEncoder::with_instance_id("test-instance".to_string());
        let request = encoder.encode(&rollup(Window::Today)).unwrap();

        assert_eq!(request.schema_version, SCHEMA_VERSION);
        assert_eq!(request.producer.name, PRODUCER_NAME);
        assert_eq!(request.producer.version, JOURNAL_VERSION);
        assert_eq!(request.producer.instance_id, "test-instance");
        assert_eq!(request.window, Window::Today);

        assert!(request.prompt.contains("Average pulse: 68 bpm"));
        assert!(request.prompt.contains("Mood: neutral x1"));
        assert!(request.prompt.contains("1 of 1 doses taken (100%)"));
        // no weight was logged, so none is mentioned
        assert!(!request.prompt.contains("weight"));
        // record contents such as drug names stay out of the prompt
        assert!(!request.prompt.contains("Metformin"));
    }

    #[test]
    fn test_weekly_prompt_lists_non_empty_buckets() {
        let encoder = AnalysisEncoder::new();
        let request = encoder.encode(&rollup(Window::Last30DaysByWeek)).unwrap();

        assert!(request.prompt.contains("week 5:"));
        assert!(!request.prompt.contains("week 1:"));
    }

    #[test]
    fn test_empty_rollup_is_not_encoded() {
        let encoder = AnalysisEncoder::new();
        let empty = RollupSummary::Empty {
            window: Window::Last7Days,
        };
        assert!(matches!(
            encoder.encode(&empty),
            Err(JournalError::EncodingError(_))
        ));
    }

    #[test]
    fn test_encode_to_json() {
        let encoder = AnalysisEncoder::new();
        let json = encoder.encode_to_json(&rollup(Window::Last7Days)).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("producer").is_some());
        assert!(parsed.get("prompt").is_some());
        assert_eq!(parsed["window"], "last_7_days");
        assert_eq!(parsed["summary"]["kind"], "window");
    }
}
