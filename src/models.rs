use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::dates::date_key;

/// Template id (as a string) -> completed flag, for a single day.
pub type DayCompletions = BTreeMap<String, bool>;

/// Period key -> ordered habits defined for that period.
pub type PeriodBuckets = BTreeMap<String, Vec<PeriodHabit>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTemplate {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl DailyTemplate {
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.is_none_or(|end| date <= end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodHabit {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Weekly,
    Monthly,
    Yearly,
}

impl PeriodKind {
    pub const ALL: [PeriodKind; 3] = [PeriodKind::Weekly, PeriodKind::Monthly, PeriodKind::Yearly];

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodKind::Weekly => "weekly",
            PeriodKind::Monthly => "monthly",
            PeriodKind::Yearly => "yearly",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "weekly" => Ok(PeriodKind::Weekly),
            "monthly" => Ok(PeriodKind::Monthly),
            "yearly" => Ok(PeriodKind::Yearly),
            other => Err(format!("invalid period '{other}'")),
        }
    }
}

/// Which checklist a habit lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HabitKind {
    Daily,
    Period(PeriodKind),
}

impl fmt::Display for HabitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HabitKind::Daily => f.write_str("daily"),
            HabitKind::Period(kind) => fmt::Display::fmt(kind, f),
        }
    }
}

/// Addresses one checkbox: `(kind, key, id)`.
///
/// For daily habits `key` is the date key the completion belongs to; a
/// template-level operation (delete) uses an empty key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HabitRef {
    pub kind: HabitKind,
    pub key: String,
    pub id: i64,
}

impl HabitRef {
    pub fn daily(date: NaiveDate, template_id: i64) -> Self {
        Self {
            kind: HabitKind::Daily,
            key: date_key(date),
            id: template_id,
        }
    }

    pub fn template(template_id: i64) -> Self {
        Self {
            kind: HabitKind::Daily,
            key: String::new(),
            id: template_id,
        }
    }

    pub fn period(kind: PeriodKind, key: impl Into<String>, id: i64) -> Self {
        Self {
            kind: HabitKind::Period(kind),
            key: key.into(),
            id,
        }
    }
}

impl fmt::Display for HabitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.key, self.id)
    }
}

/// Full dataset as served by `GET /api/data`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub daily_templates: Vec<DailyTemplate>,
    pub daily_completions: BTreeMap<String, DayCompletions>,
    pub weekly: PeriodBuckets,
    pub monthly: PeriodBuckets,
    pub yearly: PeriodBuckets,
}

impl Snapshot {
    pub fn template(&self, id: i64) -> Option<&DailyTemplate> {
        self.daily_templates.iter().find(|template| template.id == id)
    }

    pub fn template_mut(&mut self, id: i64) -> Option<&mut DailyTemplate> {
        self.daily_templates.iter_mut().find(|template| template.id == id)
    }

    pub fn active_templates(&self, date: NaiveDate) -> impl Iterator<Item = &DailyTemplate> {
        self.daily_templates
            .iter()
            .filter(move |template| template.is_active_on(date))
    }

    pub fn is_completed(&self, date: NaiveDate, template_id: i64) -> bool {
        self.daily_completions
            .get(&date_key(date))
            .and_then(|day| day.get(&template_id.to_string()))
            .copied()
            .unwrap_or(false)
    }

    /// Records or clears a completion. Clearing removes the entry, and the
    /// day itself once nothing is left in it.
    pub fn set_completed(&mut self, date: NaiveDate, template_id: i64, completed: bool) {
        let day_key = date_key(date);
        let id = template_id.to_string();
        if completed {
            self.daily_completions.entry(day_key).or_default().insert(id, true);
            return;
        }
        if let Some(day) = self.daily_completions.get_mut(&day_key) {
            day.remove(&id);
            if day.is_empty() {
                self.daily_completions.remove(&day_key);
            }
        }
    }

    pub fn buckets(&self, kind: PeriodKind) -> &PeriodBuckets {
        match kind {
            PeriodKind::Weekly => &self.weekly,
            PeriodKind::Monthly => &self.monthly,
            PeriodKind::Yearly => &self.yearly,
        }
    }

    pub fn buckets_mut(&mut self, kind: PeriodKind) -> &mut PeriodBuckets {
        match kind {
            PeriodKind::Weekly => &mut self.weekly,
            PeriodKind::Monthly => &mut self.monthly,
            PeriodKind::Yearly => &mut self.yearly,
        }
    }

    pub fn bucket(&self, kind: PeriodKind, key: &str) -> &[PeriodHabit] {
        self.buckets(kind).get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn period_habit_mut(&mut self, kind: PeriodKind, key: &str, id: i64) -> Option<&mut PeriodHabit> {
        self.buckets_mut(kind)
            .get_mut(key)
            .and_then(|bucket| bucket.iter_mut().find(|habit| habit.id == id))
    }

    /// Drops `false` completions and the days they leave empty, so the
    /// snapshot only records what is actually done.
    pub fn normalize(&mut self) {
        for day in self.daily_completions.values_mut() {
            day.retain(|_, completed| *completed);
        }
        self.daily_completions.retain(|_, day| !day.is_empty());
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyToggleRequest {
    pub date_key: String,
    pub template_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyToggleResponse {
    pub date_key: String,
    pub template_id: i64,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodAddRequest {
    pub key: String,
    pub name: String,
}

/// Body of both `/api/{period}/toggle` and `/api/{period}/delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodItemRequest {
    #[serde(default)]
    pub key: String,
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodToggleResponse {
    pub ok: bool,
    pub habit: PeriodHabit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisQuery {
    pub scope: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub scope: String,
    pub year: Option<String>,
    pub total_habits: usize,
    pub completed_habits: usize,
    pub completion_rate: u32,
}
