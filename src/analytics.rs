use crate::dates::{MONTH_LABELS, days_in_month, week_keys_for_month};
use crate::models::{PeriodKind, Snapshot};
use crate::progress::{
    StreakScan, current_streak, daily_percent, longest_streak, monthly_average, period_percent,
};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    /// No habit active that day.
    None,
    Low,
    Medium,
    High,
}

impl Band {
    pub fn of(percent: Option<u32>) -> Self {
        match percent {
            None => Band::None,
            Some(value) if value >= 80 => Band::High,
            Some(value) if value >= 50 => Band::Medium,
            Some(_) => Band::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayRow {
    pub date: NaiveDate,
    pub percent: Option<u32>,
    pub band: Band,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub today_percent: u32,
    pub motivation: &'static str,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub monthly_average: f64,
}

pub fn motivation(percent: u32) -> &'static str {
    match percent {
        100.. => "Perfect! You're crushing it!",
        80.. => "Great job! Almost perfect.",
        50.. => "Good effort. Keep pushing!",
        _ => "Let's get back on track.",
    }
}

/// One point per day of the month; days without habits plot as 0.
pub fn daily_series(snapshot: &Snapshot, year: i32, month: u32) -> Vec<ChartPoint> {
    days_in_month(year, month)
        .into_iter()
        .map(|date| ChartPoint {
            label: date.day().to_string(),
            value: daily_percent(snapshot, date).unwrap_or(0),
        })
        .collect()
}

/// Weekly-bucket completion for each ISO week touching the month.
pub fn weekly_series(snapshot: &Snapshot, year: i32, month: u32) -> Vec<ChartPoint> {
    week_keys_for_month(year, month)
        .into_iter()
        .map(|key| {
            let value = period_percent(snapshot, PeriodKind::Weekly, &key);
            let label = key
                .split_once('-')
                .map(|(_, week)| week.to_string())
                .unwrap_or_else(|| key.clone());
            ChartPoint { label, value }
        })
        .collect()
}

/// Rounded monthly average of daily completion for each month of the year.
pub fn monthly_series(snapshot: &Snapshot, year: i32) -> Vec<ChartPoint> {
    MONTH_LABELS
        .iter()
        .zip(1u32..)
        .map(|(label, month)| ChartPoint {
            label: (*label).to_string(),
            value: monthly_average(snapshot, year, month).round() as u32,
        })
        .collect()
}

pub fn day_table(snapshot: &Snapshot, year: i32, month: u32) -> Vec<DayRow> {
    days_in_month(year, month)
        .into_iter()
        .map(|date| {
            let percent = daily_percent(snapshot, date);
            DayRow {
                date,
                percent,
                band: Band::of(percent),
            }
        })
        .collect()
}

pub fn kpis(
    snapshot: &Snapshot,
    today: NaiveDate,
    (year, month): (i32, u32),
    threshold: u32,
    scan: StreakScan,
) -> Kpis {
    let today_percent = daily_percent(snapshot, today).unwrap_or(0);
    Kpis {
        today_percent,
        motivation: motivation(today_percent),
        current_streak: current_streak(snapshot, today, threshold),
        longest_streak: longest_streak(snapshot, threshold, scan),
        monthly_average: monthly_average(snapshot, year, month),
    }
}
