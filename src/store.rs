//! Server-side dataset and the operations behind each API route.
//!
//! Unlike the client snapshot, the store keeps `false` completions: a daily
//! toggle flips a recorded row, and the daily analysis counts every recorded
//! row. `GET /api/data` only reports completed rows.

use crate::dates::{date_key, parse_date_key};
use crate::errors::AppError;
use crate::models::{AnalysisResponse, DailyTemplate, PeriodHabit, PeriodKind, Snapshot};
use crate::progress::percent;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StoredData {
    #[serde(flatten)]
    pub habits: Snapshot,
    #[serde(default)]
    pub next_id: i64,
}

impl StoredData {
    fn allocate_id(&mut self) -> i64 {
        let highest = self
            .habits
            .daily_templates
            .iter()
            .map(|template| template.id)
            .chain(
                PeriodKind::ALL
                    .iter()
                    .flat_map(|kind| self.habits.buckets(*kind).values().flatten())
                    .map(|habit| habit.id),
            )
            .max()
            .unwrap_or(0);
        self.next_id = self.next_id.max(highest) + 1;
        self.next_id
    }

    pub fn snapshot(&self) -> Snapshot {
        self.habits.clone().normalized()
    }

    pub fn add_template(
        &mut self,
        name: &str,
        requested_start: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<DailyTemplate, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request("Missing name"));
        }
        if requested_start.is_some_and(|start| start < today) {
            return Err(AppError::bad_request("Cannot create a habit in the past!"));
        }

        let template = DailyTemplate {
            id: self.allocate_id(),
            name: name.to_string(),
            start_date: today,
            end_date: None,
        };
        self.habits.daily_templates.push(template.clone());
        Ok(template)
    }

    /// Soft delete: sets `end_date` unless the template already ended.
    pub fn end_template(&mut self, id: i64, today: NaiveDate) {
        if let Some(template) = self.habits.template_mut(id) {
            if template.end_date.is_none() {
                template.end_date = Some(today);
            }
        }
    }

    /// Flips the recorded completion; an unrecorded one becomes `true`.
    pub fn toggle_daily(&mut self, date_key_raw: &str, template_id: i64) -> Result<bool, AppError> {
        let date = parse_date_key(date_key_raw.trim())
            .ok_or_else(|| AppError::bad_request("Missing or invalid dateKey"))?;
        let day = self
            .habits
            .daily_completions
            .entry(date_key(date))
            .or_default();
        let completed = day
            .get(&template_id.to_string())
            .map_or(true, |completed| !completed);
        day.insert(template_id.to_string(), completed);
        Ok(completed)
    }

    pub fn add_period(&mut self, kind: PeriodKind, key: &str, name: &str) -> Result<PeriodHabit, AppError> {
        let key = key.trim();
        let name = name.trim();
        if key.is_empty() || name.is_empty() {
            return Err(AppError::bad_request("Missing key or name"));
        }
        let habit = PeriodHabit {
            id: self.allocate_id(),
            name: name.to_string(),
            completed: false,
        };
        self.habits
            .buckets_mut(kind)
            .entry(key.to_string())
            .or_default()
            .push(habit.clone());
        Ok(habit)
    }

    /// Ids are unique across buckets, so an unknown or empty key falls back
    /// to searching every bucket of the kind.
    fn find_period_mut(&mut self, kind: PeriodKind, key: &str, id: i64) -> Option<&mut PeriodHabit> {
        let buckets = self.habits.buckets_mut(kind);
        let in_key = buckets
            .get(key)
            .is_some_and(|bucket| bucket.iter().any(|habit| habit.id == id));
        if in_key {
            return buckets
                .get_mut(key)
                .and_then(|bucket| bucket.iter_mut().find(|habit| habit.id == id));
        }
        buckets
            .values_mut()
            .flat_map(|bucket| bucket.iter_mut())
            .find(|habit| habit.id == id)
    }

    pub fn toggle_period(&mut self, kind: PeriodKind, key: &str, id: i64) -> Result<PeriodHabit, AppError> {
        let habit = self
            .find_period_mut(kind, key, id)
            .ok_or_else(|| AppError::not_found("Habit not found"))?;
        habit.completed = !habit.completed;
        Ok(habit.clone())
    }

    pub fn delete_period(&mut self, kind: PeriodKind, id: i64) {
        let buckets = self.habits.buckets_mut(kind);
        for bucket in buckets.values_mut() {
            bucket.retain(|habit| habit.id != id);
        }
        buckets.retain(|_, bucket| !bucket.is_empty());
    }

    /// Completion rate over recorded daily rows (true and false) or over
    /// period habits, optionally limited to keys starting with `year`.
    pub fn analysis(&self, scope: &str, year: Option<&str>) -> Result<AnalysisResponse, AppError> {
        let in_year = |key: &str| year.is_none_or(|year| key.starts_with(year));

        let (total, completed) = match scope {
            "daily" => self
                .habits
                .daily_completions
                .iter()
                .filter(|(key, _)| in_year(key.as_str()))
                .flat_map(|(_, day)| day.values())
                .fold((0, 0), |(total, done), completed| (total + 1, done + usize::from(*completed))),
            other => {
                let kind: PeriodKind = other
                    .parse()
                    .map_err(|_| AppError::bad_request("Invalid scope"))?;
                self.habits
                    .buckets(kind)
                    .iter()
                    .filter(|(key, _)| in_year(key.as_str()))
                    .flat_map(|(_, bucket)| bucket.iter())
                    .fold((0, 0), |(total, done), habit| {
                        (total + 1, done + usize::from(habit.completed))
                    })
            }
        };

        Ok(AnalysisResponse {
            scope: scope.to_string(),
            year: year.map(str::to_string),
            total_habits: total,
            completed_habits: completed,
            completion_rate: percent(completed, total),
        })
    }
}
