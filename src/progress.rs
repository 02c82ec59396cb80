//! Completion percentages and streaks derived from a [`Snapshot`].
//!
//! Everything here is a pure function of its arguments; callers pass `today`
//! explicitly so results never depend on the wall clock.

use crate::dates::{day_span, days_in_month, parse_date_key, previous_day};
use crate::models::{PeriodKind, Snapshot};
use chrono::NaiveDate;
use std::str::FromStr;

pub const DEFAULT_STREAK_THRESHOLD: u32 = 50;

/// Which days the longest-streak scan visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreakScan {
    /// Only dates that appear as keys in the completion map. Gaps in the map
    /// are skipped rather than breaking a run.
    #[default]
    RecordedDates,
    /// Every calendar day from the first to the last recorded date; a gap day
    /// breaks the run like any other day below the threshold.
    Calendar,
}

impl FromStr for StreakScan {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "recorded" | "recorded_dates" => Ok(StreakScan::RecordedDates),
            "calendar" => Ok(StreakScan::Calendar),
            other => Err(format!("unknown streak scan '{other}'")),
        }
    }
}

pub fn percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (done as f64 * 100.0 / total as f64).round() as u32
}

/// `None` when no template is active on `date`, which is not the same as 0%.
pub fn daily_percent(snapshot: &Snapshot, date: NaiveDate) -> Option<u32> {
    let (done, total) = snapshot
        .active_templates(date)
        .fold((0, 0), |(done, total), template| {
            let done = done + usize::from(snapshot.is_completed(date, template.id));
            (done, total + 1)
        });
    (total > 0).then(|| percent(done, total))
}

pub fn period_percent(snapshot: &Snapshot, kind: PeriodKind, key: &str) -> u32 {
    let bucket = snapshot.bucket(kind, key);
    let done = bucket.iter().filter(|habit| habit.completed).count();
    percent(done, bucket.len())
}

fn qualifies(snapshot: &Snapshot, date: NaiveDate, threshold: u32) -> bool {
    daily_percent(snapshot, date).is_some_and(|value| value >= threshold)
}

/// Consecutive qualifying days ending at `today`, walking backward.
pub fn current_streak(snapshot: &Snapshot, today: NaiveDate, threshold: u32) -> u32 {
    let mut streak = 0;
    let mut cursor = Some(today);
    // Terminates: before the earliest template start no template is active.
    while let Some(date) = cursor {
        if !qualifies(snapshot, date, threshold) {
            break;
        }
        streak += 1;
        cursor = previous_day(date);
    }
    streak
}

pub fn longest_streak(snapshot: &Snapshot, threshold: u32, scan: StreakScan) -> u32 {
    let recorded: Vec<NaiveDate> = snapshot
        .daily_completions
        .keys()
        .filter_map(|key| parse_date_key(key))
        .collect();

    match scan {
        StreakScan::RecordedDates => longest_run(recorded.into_iter(), snapshot, threshold),
        StreakScan::Calendar => match (recorded.first(), recorded.last()) {
            (Some(&first), Some(&last)) => longest_run(day_span(first, last), snapshot, threshold),
            _ => 0,
        },
    }
}

fn longest_run(dates: impl Iterator<Item = NaiveDate>, snapshot: &Snapshot, threshold: u32) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    for date in dates {
        if qualifies(snapshot, date, threshold) {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

/// Mean daily percent over the month's days that have any active habit.
pub fn monthly_average(snapshot: &Snapshot, year: i32, month: u32) -> f64 {
    let percents: Vec<u32> = days_in_month(year, month)
        .into_iter()
        .filter_map(|date| daily_percent(snapshot, date))
        .collect();
    if percents.is_empty() {
        return 0.0;
    }
    percents.iter().map(|value| f64::from(*value)).sum::<f64>() / percents.len() as f64
}
