//! Row-per-observation table
//!
//! Expands the sparse health records into one row per present field, adds one
//! row per food and medication record, and provides ordering, filtering and
//! CSV rendering over the result. Projection never mutates the records.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Snapshot;
use crate::types::{
    Collection, FoodRecord, HealthRecord, MedicationRecord, RecordRef, TemperatureUnit,
};

/// CSV header row
pub const CSV_HEADER: [&str; 6] = ["Date", "Time", "Type", "Details", "Value", "Unit"];

/// What a row observes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObservationKind {
    BloodPressure,
    Pulse,
    Weight,
    Temperature,
    Mood,
    Smoking,
    Pain,
    Movement,
    Sport,
    Food,
    Medication,
}

impl ObservationKind {
    pub fn label(&self) -> &'static str {
        match self {
            ObservationKind::BloodPressure => "Blood Pressure",
            ObservationKind::Pulse => "Pulse",
            ObservationKind::Weight => "Weight",
            ObservationKind::Temperature => "Temperature",
            ObservationKind::Mood => "Mood",
            ObservationKind::Smoking => "Smoking",
            ObservationKind::Pain => "Pain",
            ObservationKind::Movement => "Movement",
            ObservationKind::Sport => "Sport",
            ObservationKind::Food => "Food",
            ObservationKind::Medication => "Medication",
        }
    }

    /// Millisecond offset added to the record time so that rows expanded
    /// from one health record keep a stable relative order
    pub fn sort_offset(&self) -> i64 {
        match self {
            ObservationKind::BloodPressure => 0,
            ObservationKind::Pulse => 1,
            ObservationKind::Weight => 2,
            ObservationKind::Temperature => 3,
            ObservationKind::Mood => 4,
            ObservationKind::Smoking => 5,
            ObservationKind::Pain => 6,
            ObservationKind::Movement => 7,
            ObservationKind::Sport => 8,
            ObservationKind::Food | ObservationKind::Medication => 0,
        }
    }
}

/// Cell value of a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservationValue {
    Number(f64),
    Text(String),
}

impl ObservationValue {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ObservationValue::Number(a), ObservationValue::Number(b)) => a.total_cmp(b),
            (ObservationValue::Number(_), ObservationValue::Text(_)) => Ordering::Less,
            (ObservationValue::Text(_), ObservationValue::Number(_)) => Ordering::Greater,
            (ObservationValue::Text(a), ObservationValue::Text(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for ObservationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservationValue::Number(n) => write!(f, "{n}"),
            ObservationValue::Text(s) => f.write_str(s),
        }
    }
}

/// One observation in the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    /// Local date, `YYYY-MM-DD`
    pub date: String,
    /// Local time, `HH:MM`
    pub time: String,
    pub kind: ObservationKind,
    pub details: String,
    pub value: ObservationValue,
    pub unit: String,
    pub source: RecordRef,
    pub sort_key: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortColumn {
    Date,
    Time,
    Type,
    Details,
    Value,
    Unit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// User-chosen column ordering; ties fall back to the default order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOverride {
    pub column: SortColumn,
    pub direction: SortDirection,
}

/// Narrowing filter over projected rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    /// Case-insensitive substring of the type label or details
    pub search: Option<String>,
    /// Exact local date, `YYYY-MM-DD`
    pub date: Option<String>,
}

impl RowFilter {
    pub fn matches(&self, row: &ObservationRow) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                row.kind.label().to_lowercase().contains(&needle)
                    || row.details.to_lowercase().contains(&needle)
            }
        };
        let date_ok = match self.date.as_deref() {
            None | Some("") => true,
            Some(date) => row.date == date,
        };
        search_ok && date_ok
    }

    /// Rows that pass the filter, in their original order
    pub fn apply(&self, rows: &[ObservationRow]) -> Vec<ObservationRow> {
        rows.iter().filter(|row| self.matches(row)).cloned().collect()
    }
}

/// Tabular projection over record snapshots
pub struct Projection;

impl Projection {
    /// Expand all records into rows, in the default order
    pub fn project(snapshot: &Snapshot<'_>, offset: FixedOffset) -> Vec<ObservationRow> {
        let mut rows = Vec::with_capacity(snapshot.len());

        for record in snapshot.health {
            expand_health(record, &offset, &mut rows);
        }
        rows.extend(snapshot.foods.iter().map(|r| food_row(r, &offset)));
        rows.extend(snapshot.medications.iter().map(|r| medication_row(r, &offset)));

        Self::sort(&mut rows, None);
        rows
    }

    /// Order rows by `sort_key` descending, or by the override column
    pub fn sort(rows: &mut [ObservationRow], sort: Option<SortOverride>) {
        rows.sort_by(|a, b| {
            let primary = match sort {
                None => Ordering::Equal,
                Some(SortOverride { column, direction }) => {
                    let ord = compare_column(a, b, column);
                    match direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                }
            };
            primary.then_with(|| b.sort_key.cmp(&a.sort_key))
        });
    }

    /// Render rows as CSV with a header line
    pub fn to_csv(rows: &[ObservationRow]) -> String {
        let mut out = String::new();
        push_csv_line(&mut out, CSV_HEADER.iter().copied());
        for row in rows {
            let value = row.value.to_string();
            push_csv_line(
                &mut out,
                [
                    row.date.as_str(),
                    row.time.as_str(),
                    row.kind.label(),
                    row.details.as_str(),
                    value.as_str(),
                    row.unit.as_str(),
                ],
            );
        }
        out
    }
}

fn compare_column(a: &ObservationRow, b: &ObservationRow, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Date => a.date.cmp(&b.date),
        SortColumn::Time => a.time.cmp(&b.time),
        SortColumn::Type => a.kind.label().cmp(b.kind.label()),
        SortColumn::Details => a.details.cmp(&b.details),
        SortColumn::Value => a.value.compare(&b.value),
        SortColumn::Unit => a.unit.cmp(&b.unit),
    }
}

fn push_csv_line<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push_str("\r\n");
}

/// Shared columns of every row built from one record
struct RowStamp<'a> {
    date: String,
    time: String,
    millis: i64,
    source: &'a RecordRef,
}

impl RowStamp<'_> {
    fn row(
        &self,
        kind: ObservationKind,
        details: impl Into<String>,
        value: ObservationValue,
        unit: &str,
    ) -> ObservationRow {
        ObservationRow {
            date: self.date.clone(),
            time: self.time.clone(),
            kind,
            details: details.into(),
            value,
            unit: unit.to_string(),
            source: self.source.clone(),
            sort_key: self.millis + kind.sort_offset(),
        }
    }
}

fn stamp<'a>(
    timestamp: DateTime<Utc>,
    offset: &FixedOffset,
    source: &'a RecordRef,
) -> RowStamp<'a> {
    let local = timestamp.with_timezone(offset);
    RowStamp {
        date: local.format("%Y-%m-%d").to_string(),
        time: local.format("%H:%M").to_string(),
        millis: timestamp.timestamp_millis(),
        source,
    }
}

fn expand_health(record: &HealthRecord, offset: &FixedOffset, rows: &mut Vec<ObservationRow>) {
    let source = RecordRef::new(Collection::Health, record.id.as_str());
    let s = stamp(record.timestamp, offset, &source);
    use ObservationValue::{Number, Text};

    if let Some(bp) = record.blood_pressure {
        rows.push(s.row(
            ObservationKind::BloodPressure,
            "Systolic/Diastolic",
            Text(format!("{}/{}", bp.systolic, bp.diastolic)),
            "mmHg",
        ));
    }
    if let Some(pulse) = record.pulse {
        rows.push(s.row(ObservationKind::Pulse, "Heart rate", Number(pulse), "bpm"));
    }
    if let Some(weight) = record.weight {
        rows.push(s.row(ObservationKind::Weight, "Body weight", Number(weight), "kg"));
    }
    if let Some(celsius) = record.temperature {
        let unit = record.temperature_unit.unwrap_or(TemperatureUnit::Celsius);
        let shown = (unit.from_celsius(celsius) * 10.0).round() / 10.0;
        rows.push(s.row(
            ObservationKind::Temperature,
            "Body temperature",
            Number(shown),
            unit.symbol(),
        ));
    }
    if let Some(mood) = record.mood {
        rows.push(s.row(ObservationKind::Mood, "Mood", Text(mood.as_str().to_string()), ""));
    }
    if record.smoked == Some(true) {
        let value = match record.cigarette_count {
            Some(count) => Number(f64::from(count)),
            None => Text("yes".to_string()),
        };
        rows.push(s.row(ObservationKind::Smoking, "Smoked", value, "cigarettes"));
    }
    if let Some(level) = record.pain_level {
        let details = record.pain_notes.as_deref().unwrap_or("Pain level");
        rows.push(s.row(ObservationKind::Pain, details, Number(f64::from(level)), "/10"));
    }
    if let Some(level) = record.movement_level {
        rows.push(s.row(
            ObservationKind::Movement,
            "Movement",
            Text(level.label().to_string()),
            "",
        ));
    }
    if record.sport == Some(true) {
        rows.push(s.row(ObservationKind::Sport, "Did sport", Text("yes".to_string()), ""));
    }
}

fn food_row(record: &FoodRecord, offset: &FixedOffset) -> ObservationRow {
    let source = RecordRef::new(Collection::Food, record.id.as_str());
    stamp(record.timestamp, offset, &source).row(
        ObservationKind::Food,
        record.description.as_str(),
        ObservationValue::Number(record.nutrition.calories),
        "kcal",
    )
}

fn medication_row(record: &MedicationRecord, offset: &FixedOffset) -> ObservationRow {
    let source = RecordRef::new(Collection::Medication, record.id.as_str());
    let mut details = record.name.clone();
    if !record.dosage.is_empty() {
        details.push(' ');
        details.push_str(&record.dosage);
    }
    details.push_str(&format!(" ({})", record.frequency.label()));

    let status = if record.taken { "taken" } else { "not taken" };
    stamp(record.timestamp, offset, &source).row(
        ObservationKind::Medication,
        details,
        ObservationValue::Text(status.to_string()),
        "",
    )
}
