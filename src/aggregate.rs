//! Windowed rollups
//!
//! This module aggregates the three record collections over a time window:
//! - Nutrition totals over food entries
//! - Per-field vital averages, counting only records where the field is present
//! - Mood / movement distributions, smoking and sport days, pain statistics
//! - Medication adherence
//! - Weekly buckets with a weight trend for the 30-day view
//!
//! A field with no eligible readings is reported as `None`, never as `0`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Snapshot;
use crate::types::{FoodRecord, HealthRecord, MedicationRecord, Mood, MovementLevel};

/// Weight change (kg) below which the 30-day trend is reported as stable
pub const WEIGHT_TREND_DEADBAND_KG: f64 = 0.5;

/// Length of the weekly view lookback (days)
pub const WEEKLY_LOOKBACK_DAYS: i64 = 30;

/// Aggregation window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    /// Records whose local calendar date equals today's
    Today,
    #[serde(rename = "last_7_days")]
    Last7Days,
    /// 30-day lookback split into buckets of 7, 7, 7, 7 and 2 days
    #[serde(rename = "last_30_days_by_week")]
    Last30DaysByWeek,
    #[serde(rename = "last_90_days")]
    Last90Days,
}

impl Window {
    pub fn as_str(&self) -> &'static str {
        match self {
            Window::Today => "today",
            Window::Last7Days => "last_7_days",
            Window::Last30DaysByWeek => "last_30_days_by_week",
            Window::Last90Days => "last_90_days",
        }
    }
}

/// Direction of the weight trend across the weekly buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

/// Food totals over a window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionTotals {
    pub calories: f64,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
    pub entries: usize,
    /// Distinct local dates with at least one food entry
    pub days_logged: usize,
    /// Mean of per-day calorie totals over `days_logged`
    pub avg_daily_calories: Option<f64>,
}

/// Per-field averages; `None` means no reading of that field in the window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalAverages {
    pub pulse: Option<f64>,
    pub weight: Option<f64>,
    /// Celsius
    pub temperature: Option<f64>,
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmokingSummary {
    pub cigarettes: u64,
    pub smoking_days: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PainSummary {
    pub average: Option<f64>,
    pub max: Option<u8>,
    pub entries: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicationSummary {
    pub doses_logged: usize,
    pub doses_taken: usize,
    /// `doses_taken / doses_logged`
    pub adherence: Option<f64>,
}

/// Rollup over one window or bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub label: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub nutrition: NutritionTotals,
    pub vitals: VitalAverages,
    pub mood: BTreeMap<Mood, usize>,
    pub smoking: SmokingSummary,
    pub pain: PainSummary,
    pub movement: BTreeMap<MovementLevel, usize>,
    pub sport_days: usize,
    pub medication: MedicationSummary,
    pub health_entries: usize,
}

impl WindowSummary {
    /// True when no record of any kind fell in the window
    pub fn is_empty(&self) -> bool {
        self.nutrition.entries == 0 && self.health_entries == 0 && self.medication.doses_logged == 0
    }
}

/// Result of an aggregation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RollupSummary {
    /// Nothing was logged in the window
    Empty { window: Window },
    Window {
        window: Window,
        summary: WindowSummary,
    },
    Weekly {
        window: Window,
        buckets: Vec<WindowSummary>,
        weight_trend: Option<Trend>,
    },
}

impl RollupSummary {
    pub fn window(&self) -> Window {
        match self {
            RollupSummary::Empty { window }
            | RollupSummary::Window { window, .. }
            | RollupSummary::Weekly { window, .. } => *window,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RollupSummary::Empty { .. })
    }
}

/// Membership test for one window or bucket
#[derive(Debug, Clone, Copy)]
enum Span {
    /// Local calendar date equality
    Date(NaiveDate),
    /// `start <= ts`
    Since(DateTime<Utc>),
    /// `start <= ts < end`, or `<= end` when `inclusive_end`
    Between {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        inclusive_end: bool,
    },
}

impl Span {
    fn contains(&self, ts: DateTime<Utc>, offset: &FixedOffset) -> bool {
        match *self {
            Span::Date(date) => ts.with_timezone(offset).date_naive() == date,
            Span::Since(start) => ts >= start,
            Span::Between {
                start,
                end,
                inclusive_end,
            } => ts >= start && (ts < end || (inclusive_end && ts == end)),
        }
    }
}

/// Aggregation engine over record snapshots
pub struct Aggregator;

impl Aggregator {
    /// Aggregate a snapshot over `window`, relative to the local time `now`
    pub fn aggregate(
        snapshot: &Snapshot<'_>,
        window: Window,
        now: DateTime<FixedOffset>,
    ) -> RollupSummary {
        let offset = *now.offset();
        let now_utc = now.with_timezone(&Utc);

        let rollup = match window {
            Window::Today => {
                let today = now.date_naive();
                let summary = summarize(
                    snapshot,
                    Span::Date(today),
                    &offset,
                    today.format("%Y-%m-%d").to_string(),
                    today,
                    today,
                );
                single(window, summary)
            }
            Window::Last7Days | Window::Last90Days => {
                let days = if window == Window::Last7Days { 7 } else { 90 };
                let start = now_utc - Duration::days(days);
                let summary = summarize(
                    snapshot,
                    Span::Since(start),
                    &offset,
                    format!("last {days} days"),
                    start.with_timezone(&offset).date_naive(),
                    now.date_naive(),
                );
                single(window, summary)
            }
            Window::Last30DaysByWeek => {
                let buckets: Vec<WindowSummary> = weekly_spans(now_utc)
                    .into_iter()
                    .enumerate()
                    .map(|(i, (span, start, end))| {
                        summarize(
                            snapshot,
                            span,
                            &offset,
                            format!("week {}", i + 1),
                            start.with_timezone(&offset).date_naive(),
                            end.with_timezone(&offset).date_naive(),
                        )
                    })
                    .collect();

                if buckets.iter().all(WindowSummary::is_empty) {
                    RollupSummary::Empty { window }
                } else {
                    let weight_trend = weight_trend(&buckets);
                    RollupSummary::Weekly {
                        window,
                        buckets,
                        weight_trend,
                    }
                }
            }
        };

        tracing::debug!(
            window = window.as_str(),
            empty = rollup.is_empty(),
            "aggregated window"
        );
        rollup
    }
}

fn single(window: Window, summary: WindowSummary) -> RollupSummary {
    if summary.is_empty() {
        RollupSummary::Empty { window }
    } else {
        RollupSummary::Window { window, summary }
    }
}

/// Five buckets of 7, 7, 7, 7 and 2 days covering the 30-day lookback,
/// oldest first. The last bucket ends at `now` inclusive.
fn weekly_spans(now: DateTime<Utc>) -> Vec<(Span, DateTime<Utc>, DateTime<Utc>)> {
    let lookback_start = now - Duration::days(WEEKLY_LOOKBACK_DAYS);
    (0..5)
        .map(|i| {
            let start = lookback_start + Duration::days(7 * i);
            let last = i == 4;
            let end = if last {
                now
            } else {
                lookback_start + Duration::days(7 * (i + 1))
            };
            let span = Span::Between {
                start,
                end,
                inclusive_end: last,
            };
            (span, start, end)
        })
        .collect()
}

/// Compare the first and last buckets that have a weight average
fn weight_trend(buckets: &[WindowSummary]) -> Option<Trend> {
    let mut weights = buckets.iter().filter_map(|b| b.vitals.weight);
    let first = weights.next()?;
    let last = weights.last()?;
    let change = last - first;

    Some(if change > WEIGHT_TREND_DEADBAND_KG {
        Trend::Increasing
    } else if change < -WEIGHT_TREND_DEADBAND_KG {
        Trend::Decreasing
    } else {
        Trend::Stable
    })
}

fn summarize(
    snapshot: &Snapshot<'_>,
    span: Span,
    offset: &FixedOffset,
    label: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> WindowSummary {
    let mut acc = Accumulator::new(*offset);

    for food in snapshot.foods.iter().filter(|r| span.contains(r.timestamp, offset)) {
        acc.add_food(food);
    }
    for record in snapshot.health.iter().filter(|r| span.contains(r.timestamp, offset)) {
        acc.add_health(record);
    }
    for dose in snapshot
        .medications
        .iter()
        .filter(|r| span.contains(r.timestamp, offset))
    {
        acc.add_medication(dose);
    }

    acc.finish(label, start_date, end_date)
}

/// Accumulator for one window or bucket
struct Accumulator {
    offset: FixedOffset,
    nutrition: NutritionTotals,
    calories_by_day: BTreeMap<NaiveDate, f64>,
    pulse: Vec<f64>,
    weight: Vec<f64>,
    temperature: Vec<f64>,
    systolic: Vec<f64>,
    diastolic: Vec<f64>,
    mood: BTreeMap<Mood, usize>,
    movement: BTreeMap<MovementLevel, usize>,
    cigarettes: u64,
    smoking_days: BTreeSet<NaiveDate>,
    sport_days: BTreeSet<NaiveDate>,
    pain: Vec<u8>,
    doses_logged: usize,
    doses_taken: usize,
    health_entries: usize,
}

impl Accumulator {
    fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            nutrition: NutritionTotals::default(),
            calories_by_day: BTreeMap::new(),
            pulse: Vec::new(),
            weight: Vec::new(),
            temperature: Vec::new(),
            systolic: Vec::new(),
            diastolic: Vec::new(),
            mood: BTreeMap::new(),
            movement: BTreeMap::new(),
            cigarettes: 0,
            smoking_days: BTreeSet::new(),
            sport_days: BTreeSet::new(),
            pain: Vec::new(),
            doses_logged: 0,
            doses_taken: 0,
            health_entries: 0,
        }
    }

    fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.offset).date_naive()
    }

    fn add_food(&mut self, food: &FoodRecord) {
        let n = &food.nutrition;
        self.nutrition.calories += n.calories;
        self.nutrition.carbs += n.carbs;
        self.nutrition.protein += n.protein;
        self.nutrition.fat += n.fat;
        self.nutrition.entries += 1;
        *self
            .calories_by_day
            .entry(self.local_date(food.timestamp))
            .or_insert(0.0) += n.calories;
    }

    fn add_health(&mut self, record: &HealthRecord) {
        self.health_entries += 1;

        if let Some(bp) = record
            .blood_pressure
            .filter(|bp| present(bp.systolic) && present(bp.diastolic))
        {
            self.systolic.push(bp.systolic);
            self.diastolic.push(bp.diastolic);
        }
        if let Some(pulse) = record.pulse.filter(|v| present(*v)) {
            self.pulse.push(pulse);
        }
        if let Some(weight) = record.weight.filter(|v| present(*v)) {
            self.weight.push(weight);
        }
        if let Some(temperature) = record.temperature.filter(|v| present(*v)) {
            self.temperature.push(temperature);
        }
        if let Some(mood) = record.mood {
            *self.mood.entry(mood).or_insert(0) += 1;
        }
        if let Some(level) = record.movement_level {
            *self.movement.entry(level).or_insert(0) += 1;
        }
        if record.smoked == Some(true) {
            let count = u64::from(record.cigarette_count.unwrap_or(0));
            self.cigarettes = self.cigarettes.saturating_add(count);
            self.smoking_days.insert(self.local_date(record.timestamp));
        }
        if record.sport == Some(true) {
            self.sport_days.insert(self.local_date(record.timestamp));
        }
        if let Some(level) = record.pain_level.filter(|p| *p > 0) {
            self.pain.push(level);
        }
    }

    fn add_medication(&mut self, dose: &MedicationRecord) {
        self.doses_logged += 1;
        if dose.taken {
            self.doses_taken += 1;
        }
    }

    fn finish(self, label: String, start_date: NaiveDate, end_date: NaiveDate) -> WindowSummary {
        let day_totals: Vec<f64> = self.calories_by_day.values().copied().collect();
        let pain_values: Vec<f64> = self.pain.iter().map(|p| f64::from(*p)).collect();

        WindowSummary {
            label,
            start_date,
            end_date,
            nutrition: NutritionTotals {
                days_logged: day_totals.len(),
                avg_daily_calories: mean(&day_totals),
                ..self.nutrition
            },
            vitals: VitalAverages {
                pulse: mean(&self.pulse),
                weight: mean(&self.weight),
                temperature: mean(&self.temperature),
                systolic: mean(&self.systolic),
                diastolic: mean(&self.diastolic),
            },
            mood: self.mood,
            smoking: SmokingSummary {
                cigarettes: self.cigarettes,
                smoking_days: self.smoking_days.len(),
            },
            pain: PainSummary {
                average: mean(&pain_values),
                max: self.pain.iter().copied().max(),
                entries: self.pain.len(),
            },
            movement: self.movement,
            sport_days: self.sport_days.len(),
            medication: MedicationSummary {
                doses_logged: self.doses_logged,
                doses_taken: self.doses_taken,
                adherence: if self.doses_logged > 0 {
                    Some(self.doses_taken as f64 / self.doses_logged as f64)
                } else {
                    None
                },
            },
            health_entries: self.health_entries,
        }
    }
}

fn present(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Mean of the values, `None` for an empty slice
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(sum / values.len() as f64)
}
