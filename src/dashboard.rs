//! Session state for the habit dashboard and the mutations the user can
//! trigger on it.
//!
//! Each toggle runs in three steps: [`Dashboard::begin_toggle`] applies the
//! change locally and marks the target in flight, the caller sends the
//! request, and [`Dashboard::settle_toggle`] commits or rolls back. The
//! `async` helpers run all three in sequence; the split lets an event loop
//! keep requests for different targets in flight at once.

use crate::analytics::{self, Kpis};
use crate::client::{HabitApi, HttpApi};
use crate::config::BoardConfig;
use crate::dates::{date_key, local_today, month_key, parse_date_key, week_key};
use crate::errors::{ClientError, MutationError};
use crate::models::{HabitKind, HabitRef, PeriodKind, Snapshot};
use crate::optimistic::{FlagLens, MutationState, Optimistic};
use crate::progress::{daily_percent, period_percent};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// What the dashboard needs from whatever draws it.
pub trait Ui {
    /// Redraw one level (checklist + progress bar).
    fn refresh(&mut self, view: &LevelView);

    fn confirm(&mut self, message: &str) -> bool;

    fn alert(&mut self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub id: i64,
    pub name: String,
    pub completed: bool,
}

/// Render-ready state of one checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelView {
    pub kind: HabitKind,
    pub key: String,
    pub items: Vec<ChecklistItem>,
    /// `None` for a day without any active habit.
    pub percent: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHabit {
    pub kind: HabitKind,
    /// Selected date key for daily habits, period key otherwise.
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Toggle(HabitRef),
    Add(NewHabit),
    Delete(HabitRef),
}

/// Pretty-printed copy of the snapshot, named after the day it was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotExport {
    pub file_name: String,
    pub contents: String,
}

/// Which week, month and year the period checklists show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PeriodCursor {
    /// Any day of the shown week.
    week: NaiveDate,
    month: (i32, u32),
    year: i32,
}

impl PeriodCursor {
    fn at(date: NaiveDate) -> Self {
        Self {
            week: date,
            month: (date.year(), date.month()),
            year: date.year(),
        }
    }

    fn key(&self, kind: PeriodKind) -> String {
        match kind {
            PeriodKind::Weekly => week_key(self.week),
            PeriodKind::Monthly => month_key(self.month.0, self.month.1),
            PeriodKind::Yearly => self.year.to_string(),
        }
    }

    fn shift(&mut self, kind: PeriodKind, step: i32) {
        match kind {
            PeriodKind::Weekly => {
                if let Some(week) = self.week.checked_add_signed(Duration::weeks(i64::from(step))) {
                    self.week = week;
                }
            }
            PeriodKind::Monthly => {
                let (year, month) = self.month;
                let index = year * 12 + month as i32 - 1 + step;
                self.month = (index.div_euclid(12), index.rem_euclid(12) as u32 + 1);
            }
            PeriodKind::Yearly => self.year += step,
        }
    }
}

/// A toggle applied locally and waiting for the server.
#[derive(Debug)]
#[must_use = "pass to Dashboard::settle_toggle once the request finishes"]
pub struct PendingToggle {
    target: HabitRef,
    edit: Optimistic<FlagLens>,
}

impl PendingToggle {
    pub fn target(&self) -> &HabitRef {
        &self.target
    }

    pub fn state(&self) -> MutationState {
        self.edit.state()
    }
}

pub struct Dashboard<U: Ui> {
    snapshot: Snapshot,
    ui: U,
    config: BoardConfig,
    in_flight: BTreeSet<HabitRef>,
    selected_date: NaiveDate,
    periods: PeriodCursor,
    clock: fn() -> NaiveDate,
}

impl<U: Ui> Dashboard<U> {
    pub fn new(snapshot: Snapshot, ui: U) -> Self {
        let today = local_today();
        Self {
            snapshot: snapshot.normalized(),
            ui,
            config: BoardConfig::default(),
            in_flight: BTreeSet::new(),
            selected_date: today,
            periods: PeriodCursor::at(today),
            clock: local_today,
        }
    }

    pub async fn load<A: HabitApi>(api: &A, ui: U) -> Result<Self, ClientError> {
        let snapshot = api.fetch_snapshot().await?;
        info!(
            templates = snapshot.daily_templates.len(),
            "loaded habit snapshot"
        );
        Ok(Self::new(snapshot, ui))
    }

    /// Loads from `config.api_url` and keeps the streak settings for
    /// [`Dashboard::kpis`].
    pub async fn connect(config: BoardConfig, ui: U) -> Result<(HttpApi, Self), ClientError> {
        let api = HttpApi::from_config(&config);
        let board = Self::load(&api, ui).await?.with_config(config);
        Ok((api, board))
    }

    pub async fn connect_from_env(ui: U) -> Result<(HttpApi, Self), ClientError> {
        Self::connect(BoardConfig::from_env(), ui).await
    }

    pub fn with_config(mut self, config: BoardConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the source of "today"; also re-selects that day and the
    /// periods containing it.
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        let today = clock();
        self.clock = clock;
        self.selected_date = today;
        self.periods = PeriodCursor::at(today);
        self
    }

    /// Replaces the snapshot with the server's. Refused while any change is
    /// in flight, since settling it would write into the new data.
    pub async fn reload<A: HabitApi>(&mut self, api: &A) -> Result<(), MutationError> {
        if let Some(target) = self.in_flight.first() {
            return Err(self.refuse(MutationError::InFlight(target.clone())));
        }
        let snapshot = match api.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => return Err(self.refuse(err.into())),
        };
        self.snapshot = snapshot.normalized();
        info!(
            templates = self.snapshot.daily_templates.len(),
            "reloaded habit snapshot"
        );
        self.refresh(HabitKind::Daily, &self.selected_key());
        Ok(())
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    fn selected_key(&self) -> String {
        date_key(self.selected_date)
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
        self.refresh(HabitKind::Daily, &self.selected_key());
    }

    /// Key of the week, month or year currently shown for `kind`.
    pub fn period_key(&self, kind: PeriodKind) -> String {
        self.periods.key(kind)
    }

    /// Steps the shown period forward (`step > 0`) or back and redraws it.
    pub fn change_period(&mut self, kind: PeriodKind, step: i32) {
        self.periods.shift(kind, step);
        let key = self.period_key(kind);
        debug!(%kind, %key, "showing period");
        self.refresh(HabitKind::Period(kind), &key);
    }

    /// Shows the period of `kind` that contains `date`.
    pub fn select_period(&mut self, kind: PeriodKind, date: NaiveDate) {
        let at = PeriodCursor::at(date);
        match kind {
            PeriodKind::Weekly => self.periods.week = at.week,
            PeriodKind::Monthly => self.periods.month = at.month,
            PeriodKind::Yearly => self.periods.year = at.year,
        }
        let key = self.period_key(kind);
        self.refresh(HabitKind::Period(kind), &key);
    }

    /// Input for [`Dashboard::add_habit`] keyed to what is on screen: the
    /// selected date for daily habits, the shown period otherwise.
    pub fn new_habit(&self, kind: HabitKind, name: impl Into<String>) -> NewHabit {
        let key = match kind {
            HabitKind::Daily => self.selected_key(),
            HabitKind::Period(period) => self.period_key(period),
        };
        NewHabit {
            kind,
            key,
            name: name.into(),
        }
    }

    /// The snapshot as pretty JSON, named `habit-data-YYYY-MM-DD.json`.
    pub fn export_snapshot(&self) -> Result<SnapshotExport, serde_json::Error> {
        let contents = serde_json::to_string_pretty(&self.snapshot)?;
        Ok(SnapshotExport {
            file_name: format!("habit-data-{}.json", date_key(self.today())),
            contents,
        })
    }

    pub fn is_in_flight(&self, target: &HabitRef) -> bool {
        self.in_flight.contains(target)
    }

    pub fn level_view(&self, kind: HabitKind, key: &str) -> LevelView {
        match kind {
            HabitKind::Daily => {
                let Some(date) = parse_date_key(key) else {
                    return LevelView {
                        kind,
                        key: key.to_string(),
                        items: Vec::new(),
                        percent: None,
                    };
                };
                let items = self
                    .snapshot
                    .active_templates(date)
                    .map(|template| ChecklistItem {
                        id: template.id,
                        name: template.name.clone(),
                        completed: self.snapshot.is_completed(date, template.id),
                    })
                    .collect();
                LevelView {
                    kind,
                    key: key.to_string(),
                    items,
                    percent: daily_percent(&self.snapshot, date),
                }
            }
            HabitKind::Period(period) => LevelView {
                kind,
                key: key.to_string(),
                items: self
                    .snapshot
                    .bucket(period, key)
                    .iter()
                    .map(|habit| ChecklistItem {
                        id: habit.id,
                        name: habit.name.clone(),
                        completed: habit.completed,
                    })
                    .collect(),
                percent: Some(period_percent(&self.snapshot, period, key)),
            },
        }
    }

    fn refresh(&mut self, kind: HabitKind, key: &str) {
        let view = self.level_view(kind, key);
        self.ui.refresh(&view);
    }

    /// Headline numbers for the analytics view, for the month of `today`.
    pub fn kpis(&self) -> Kpis {
        let today = self.today();
        analytics::kpis(
            &self.snapshot,
            today,
            (today.year(), today.month()),
            self.config.streak_threshold,
            self.config.streak_scan,
        )
    }

    fn refuse(&self, err: MutationError) -> MutationError {
        warn!("change refused: {err}");
        err
    }

    fn claim(&mut self, target: &HabitRef) -> Result<(), MutationError> {
        if !self.in_flight.insert(target.clone()) {
            return Err(self.refuse(MutationError::InFlight(target.clone())));
        }
        Ok(())
    }

    /// Flips the checkbox locally and marks it in flight. The returned
    /// target carries the canonical key, whatever spelling was passed in.
    pub fn begin_toggle(&mut self, target: HabitRef) -> Result<PendingToggle, MutationError> {
        let Some(lens) = FlagLens::for_ref(&target) else {
            return Err(self.refuse(MutationError::NotFound(target)));
        };
        let target = lens.target();
        if self.is_in_flight(&target) {
            return Err(self.refuse(MutationError::InFlight(target)));
        }
        let Some(mut edit) = Optimistic::apply(&mut self.snapshot, lens, |done| !done) else {
            return Err(self.refuse(MutationError::NotFound(target)));
        };
        self.claim(&target)?;
        debug!(%target, completed = *edit.after(), "applied toggle");
        self.refresh(target.kind, &target.key);
        edit.mark_sent();
        Ok(PendingToggle { target, edit })
    }

    /// Commits on success; on failure restores the pre-toggle value and
    /// tells the user.
    pub fn settle_toggle(
        &mut self,
        pending: PendingToggle,
        outcome: Result<(), ClientError>,
    ) -> MutationState {
        let PendingToggle { target, mut edit } = pending;
        self.in_flight.remove(&target);
        match outcome {
            Ok(()) => {
                edit.commit();
                debug!(%target, "toggle saved");
            }
            Err(err) => {
                edit.rollback(&mut self.snapshot);
                warn!(%target, "toggle failed, rolled back: {err}");
                self.refresh(target.kind, &target.key);
                self.ui.alert("Failed to save change. Please check your connection.");
            }
        }
        edit.state()
    }

    pub async fn toggle<A: HabitApi>(
        &mut self,
        api: &A,
        target: HabitRef,
    ) -> Result<MutationState, MutationError> {
        let pending = self.begin_toggle(target)?;
        let outcome = api.toggle(pending.target()).await;
        Ok(self.settle_toggle(pending, outcome))
    }

    /// Adds a habit once the server has created it. Daily habits cannot be
    /// added for a date before today.
    pub async fn add_habit<A: HabitApi>(
        &mut self,
        api: &A,
        input: NewHabit,
    ) -> Result<MutationState, MutationError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(self.refuse(ClientError::Validation("habit name is empty".into()).into()));
        }

        match input.kind {
            HabitKind::Daily => {
                let Some(selected) = parse_date_key(&input.key) else {
                    let err = ClientError::Validation(format!("invalid date '{}'", input.key));
                    return Err(self.refuse(err.into()));
                };
                if selected < self.today() {
                    self.ui.alert("You cannot create a habit in the past!");
                    let err = ClientError::Validation("cannot create a habit in the past".into());
                    return Err(self.refuse(err.into()));
                }
                match api.create_daily_template(name, Some(selected)).await {
                    Ok(template) => {
                        info!(id = template.id, "added daily habit");
                        self.snapshot.daily_templates.push(template);
                        self.refresh(HabitKind::Daily, &input.key);
                        Ok(MutationState::Committed)
                    }
                    Err(err) => Ok(self.report_failure("adding daily habit", &err)),
                }
            }
            HabitKind::Period(period) => match api.add_period_habit(period, &input.key, name).await {
                Ok(habit) => {
                    info!(id = habit.id, %period, key = %input.key, "added habit");
                    self.snapshot
                        .buckets_mut(period)
                        .entry(input.key.clone())
                        .or_default()
                        .push(habit);
                    self.refresh(input.kind, &input.key);
                    Ok(MutationState::Committed)
                }
                Err(err) => Ok(self.report_failure("adding habit", &err)),
            },
        }
    }

    /// Ends the template today; it stays visible on earlier dates.
    pub async fn delete_daily_template<A: HabitApi>(
        &mut self,
        api: &A,
        id: i64,
    ) -> Result<MutationState, MutationError> {
        let target = HabitRef::template(id);
        if self.snapshot.template(id).is_none() {
            return Err(self.refuse(MutationError::NotFound(target)));
        }
        if self.is_in_flight(&target) {
            return Err(self.refuse(MutationError::InFlight(target)));
        }
        if !self
            .ui
            .confirm("Are you sure you want to delete this habit? It will no longer appear from today on.")
        {
            info!(%target, "delete cancelled");
            return Err(MutationError::Cancelled);
        }

        self.claim(&target)?;
        let outcome = api.delete_daily_template(id).await;
        self.in_flight.remove(&target);
        if let Err(err) = outcome {
            return Ok(self.report_failure("deleting daily habit", &err));
        }

        let today = self.today();
        if let Some(template) = self.snapshot.template_mut(id) {
            if template.end_date.is_none() {
                template.end_date = Some(today);
            }
        }
        info!(id, "ended daily habit");
        self.refresh(HabitKind::Daily, &self.selected_key());
        Ok(MutationState::Committed)
    }

    pub async fn delete_period_habit<A: HabitApi>(
        &mut self,
        api: &A,
        kind: PeriodKind,
        key: &str,
        id: i64,
    ) -> Result<MutationState, MutationError> {
        let target = HabitRef::period(kind, key, id);
        if !self.snapshot.bucket(kind, key).iter().any(|habit| habit.id == id) {
            return Err(self.refuse(MutationError::NotFound(target)));
        }
        if self.is_in_flight(&target) {
            return Err(self.refuse(MutationError::InFlight(target)));
        }
        if !self.ui.confirm("Are you sure you want to delete this habit?") {
            info!(%target, "delete cancelled");
            return Err(MutationError::Cancelled);
        }

        self.claim(&target)?;
        let outcome = api.delete_period_habit(kind, key, id).await;
        self.in_flight.remove(&target);
        if let Err(err) = outcome {
            return Ok(self.report_failure("deleting habit", &err));
        }

        let buckets = self.snapshot.buckets_mut(kind);
        if let Some(bucket) = buckets.get_mut(key) {
            bucket.retain(|habit| habit.id != id);
            if bucket.is_empty() {
                buckets.remove(key);
            }
        }
        info!(%target, "deleted habit");
        self.refresh(target.kind, key);
        Ok(MutationState::Committed)
    }

    /// Single entry point for every user action.
    pub async fn dispatch<A: HabitApi>(
        &mut self,
        api: &A,
        action: Action,
    ) -> Result<MutationState, MutationError> {
        match action {
            Action::Toggle(target) => self.toggle(api, target).await,
            Action::Add(input) => self.add_habit(api, input).await,
            Action::Delete(HabitRef { kind: HabitKind::Daily, id, .. }) => {
                self.delete_daily_template(api, id).await
            }
            Action::Delete(HabitRef { kind: HabitKind::Period(kind), key, id }) => {
                self.delete_period_habit(api, kind, &key, id).await
            }
        }
    }

    /// Nothing was applied locally, so there is nothing to undo.
    fn report_failure(&mut self, what: &str, err: &ClientError) -> MutationState {
        warn!("{what} failed: {err}");
        self.ui.alert(&format!("Failed to save change: {err}"));
        MutationState::RolledBack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResponse, DailyTemplate, PeriodHabit};
    use crate::progress::StreakScan;
    use std::cell::{Cell, RefCell};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn jan_10() -> NaiveDate {
        day(2024, 1, 10)
    }

    #[derive(Default)]
    struct FakeApi {
        fail: Cell<bool>,
        calls: RefCell<Vec<String>>,
        next_id: Cell<i64>,
    }

    impl FakeApi {
        fn failing() -> Self {
            let api = Self::default();
            api.fail.set(true);
            api
        }

        fn record(&self, call: String) -> Result<(), ClientError> {
            self.calls.borrow_mut().push(call);
            if self.fail.get() {
                return Err(ClientError::Server {
                    status: 500,
                    message: "database is locked".into(),
                });
            }
            Ok(())
        }

        fn allocate(&self) -> i64 {
            self.next_id.set(self.next_id.get() + 1);
            100 + self.next_id.get()
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl HabitApi for FakeApi {
        async fn fetch_snapshot(&self) -> Result<Snapshot, ClientError> {
            self.record("fetch".into())?;
            Ok(sample())
        }

        async fn create_daily_template(
            &self,
            name: &str,
            _start_date: Option<NaiveDate>,
        ) -> Result<DailyTemplate, ClientError> {
            self.record(format!("create {name}"))?;
            Ok(DailyTemplate {
                id: self.allocate(),
                name: name.to_string(),
                start_date: jan_10(),
                end_date: None,
            })
        }

        async fn delete_daily_template(&self, id: i64) -> Result<(), ClientError> {
            self.record(format!("delete template {id}"))
        }

        async fn toggle(&self, target: &HabitRef) -> Result<(), ClientError> {
            self.record(format!("toggle {target}"))
        }

        async fn add_period_habit(
            &self,
            kind: PeriodKind,
            key: &str,
            name: &str,
        ) -> Result<PeriodHabit, ClientError> {
            self.record(format!("add {kind} {key} {name}"))?;
            Ok(PeriodHabit {
                id: self.allocate(),
                name: name.to_string(),
                completed: false,
            })
        }

        async fn delete_period_habit(&self, kind: PeriodKind, key: &str, id: i64) -> Result<(), ClientError> {
            self.record(format!("delete {kind} {key} {id}"))
        }

        async fn analysis(&self, scope: &str, year: Option<i32>) -> Result<AnalysisResponse, ClientError> {
            self.record(format!("analysis {scope}"))?;
            Ok(AnalysisResponse {
                scope: scope.to_string(),
                year: year.map(|y| y.to_string()),
                total_habits: 0,
                completed_habits: 0,
                completion_rate: 0,
            })
        }
    }

    #[derive(Default)]
    struct RecordingUi {
        views: Vec<LevelView>,
        alerts: Vec<String>,
        decline: bool,
    }

    impl Ui for RecordingUi {
        fn refresh(&mut self, view: &LevelView) {
            self.views.push(view.clone());
        }

        fn confirm(&mut self, _message: &str) -> bool {
            !self.decline
        }

        fn alert(&mut self, message: &str) {
            self.alerts.push(message.to_string());
        }
    }

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::default();
        snapshot.daily_templates.push(DailyTemplate {
            id: 1,
            name: "meditate".into(),
            start_date: day(2024, 1, 1),
            end_date: None,
        });
        snapshot.daily_templates.push(DailyTemplate {
            id: 2,
            name: "journal".into(),
            start_date: day(2024, 1, 1),
            end_date: None,
        });
        snapshot.set_completed(jan_10(), 1, true);
        snapshot.weekly.insert(
            "2024-W02".into(),
            vec![PeriodHabit { id: 7, name: "long run".into(), completed: false }],
        );
        snapshot
    }

    fn board() -> Dashboard<RecordingUi> {
        Dashboard::new(sample(), RecordingUi::default()).with_clock(jan_10)
    }

    #[tokio::test]
    async fn toggle_twice_restores_original_snapshot() {
        let api = FakeApi::default();
        let mut board = board();
        let original = board.snapshot().clone();
        let target = HabitRef::daily(jan_10(), 2);

        let first = board.toggle(&api, target.clone()).await.unwrap();
        assert_eq!(first, MutationState::Committed);
        assert!(board.snapshot().is_completed(jan_10(), 2));
        assert_eq!(board.ui().views.last().unwrap().percent, Some(100));

        board.toggle(&api, target).await.unwrap();
        assert_eq!(board.snapshot(), &original);
        assert!(!board.is_in_flight(&HabitRef::daily(jan_10(), 2)));
    }

    #[tokio::test]
    async fn failed_toggle_rolls_back_and_alerts() {
        let api = FakeApi::failing();
        let mut board = board();
        let original = board.snapshot().clone();

        let state = board.toggle(&api, HabitRef::daily(jan_10(), 1)).await.unwrap();
        assert_eq!(state, MutationState::RolledBack);
        assert_eq!(board.snapshot(), &original);
        assert!(board.snapshot().is_completed(jan_10(), 1));
        assert_eq!(board.ui().alerts.len(), 1);

        let views = &board.ui().views;
        assert_eq!(views[0].percent, Some(0));
        assert_eq!(views.last().unwrap().percent, Some(50));
        assert!(views.last().unwrap().items[0].completed);
    }

    #[tokio::test]
    async fn failed_period_toggle_restores_flag() {
        let api = FakeApi::failing();
        let mut board = board();
        let target = HabitRef::period(PeriodKind::Weekly, "2024-W02", 7);

        let state = board.toggle(&api, target).await.unwrap();
        assert_eq!(state, MutationState::RolledBack);
        assert!(!board.snapshot().bucket(PeriodKind::Weekly, "2024-W02")[0].completed);
    }

    #[test]
    fn overlapping_toggle_is_refused() {
        let mut board = board();
        let target = HabitRef::period(PeriodKind::Weekly, "2024-W02", 7);

        let pending = board.begin_toggle(target.clone()).unwrap();
        assert_eq!(pending.state(), MutationState::Pending);
        assert_eq!(
            board.begin_toggle(target.clone()).unwrap_err(),
            MutationError::InFlight(target.clone())
        );

        // Another target can be in flight at the same time.
        let other = board.begin_toggle(HabitRef::daily(jan_10(), 2)).unwrap();

        let failed = ClientError::Network("connection reset".into());
        assert_eq!(board.settle_toggle(pending, Err(failed)), MutationState::RolledBack);
        assert_eq!(board.settle_toggle(other, Ok(())), MutationState::Committed);
        assert!(!board.snapshot().bucket(PeriodKind::Weekly, "2024-W02")[0].completed);
        assert!(board.snapshot().is_completed(jan_10(), 2));
        assert!(board.begin_toggle(target).is_ok());
    }

    #[test]
    fn toggle_of_unknown_habit_is_not_found() {
        let mut board = board();
        let target = HabitRef::period(PeriodKind::Monthly, "2024-01", 7);
        assert_eq!(
            board.begin_toggle(target.clone()).unwrap_err(),
            MutationError::NotFound(target)
        );
        assert!(board.ui().views.is_empty());
    }

    #[tokio::test]
    async fn past_daily_add_never_reaches_network() {
        let api = FakeApi::default();
        let mut board = board();
        let input = NewHabit {
            kind: HabitKind::Daily,
            key: "2024-01-09".into(),
            name: "floss".into(),
        };

        let err = board.add_habit(&api, input).await.unwrap_err();
        assert!(matches!(err, MutationError::Client(ClientError::Validation(_))));
        assert!(api.calls().is_empty());
        assert_eq!(board.ui().alerts.len(), 1);
        assert_eq!(board.snapshot().daily_templates.len(), 2);
    }

    #[tokio::test]
    async fn blank_name_is_rejected_locally() {
        let api = FakeApi::default();
        let mut board = board();
        let input = NewHabit {
            kind: HabitKind::Period(PeriodKind::Weekly),
            key: "2024-W02".into(),
            name: "   ".into(),
        };
        assert!(board.add_habit(&api, input).await.is_err());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn add_appends_server_record() {
        let api = FakeApi::default();
        let mut board = board();

        let daily = NewHabit {
            kind: HabitKind::Daily,
            key: "2024-01-10".into(),
            name: " floss ".into(),
        };
        assert_eq!(board.add_habit(&api, daily).await.unwrap(), MutationState::Committed);
        let added = board.snapshot().daily_templates.last().unwrap();
        assert_eq!((added.id, added.name.as_str()), (101, "floss"));

        let weekly = NewHabit {
            kind: HabitKind::Period(PeriodKind::Weekly),
            key: "2024-W03".into(),
            name: "meal prep".into(),
        };
        board.add_habit(&api, weekly).await.unwrap();
        assert_eq!(board.snapshot().bucket(PeriodKind::Weekly, "2024-W03")[0].id, 102);
        assert_eq!(api.calls(), vec!["create floss", "add weekly 2024-W03 meal prep"]);
    }

    #[tokio::test]
    async fn failed_add_leaves_no_entry() {
        let api = FakeApi::failing();
        let mut board = board();
        let input = NewHabit {
            kind: HabitKind::Period(PeriodKind::Yearly),
            key: "2024".into(),
            name: "learn to swim".into(),
        };
        let state = board.add_habit(&api, input).await.unwrap();
        assert_eq!(state, MutationState::RolledBack);
        assert!(board.snapshot().yearly.is_empty());
        assert_eq!(board.ui().alerts.len(), 1);
    }

    #[tokio::test]
    async fn deleting_template_ends_it_today() {
        let api = FakeApi::default();
        let mut board = board();

        let state = board
            .dispatch(&api, Action::Delete(HabitRef::template(1)))
            .await
            .unwrap();
        assert_eq!(state, MutationState::Committed);
        let template = board.snapshot().template(1).unwrap();
        assert_eq!(template.end_date, Some(jan_10()));
        assert!(template.is_active_on(jan_10()));
        assert!(!template.is_active_on(day(2024, 1, 11)));
    }

    #[tokio::test]
    async fn declined_delete_does_nothing() {
        let api = FakeApi::default();
        let mut board = board();
        board.ui_mut().decline = true;
        let original = board.snapshot().clone();

        let err = board
            .delete_period_habit(&api, PeriodKind::Weekly, "2024-W02", 7)
            .await
            .unwrap_err();
        assert_eq!(err, MutationError::Cancelled);
        assert!(api.calls().is_empty());
        assert_eq!(board.snapshot(), &original);
    }

    #[tokio::test]
    async fn period_delete_removes_entry() {
        let api = FakeApi::default();
        let mut board = board();
        let target = HabitRef::period(PeriodKind::Weekly, "2024-W02", 7);
        board.dispatch(&api, Action::Delete(target)).await.unwrap();
        assert!(board.snapshot().bucket(PeriodKind::Weekly, "2024-W02").is_empty());
        assert_eq!(board.ui().views.last().unwrap().percent, Some(0));
    }

    #[tokio::test]
    async fn failed_delete_keeps_template_open() {
        let api = FakeApi::failing();
        let mut board = board();
        let state = board.delete_daily_template(&api, 2).await.unwrap();
        assert_eq!(state, MutationState::RolledBack);
        assert_eq!(board.snapshot().template(2).unwrap().end_date, None);
        assert!(!board.is_in_flight(&HabitRef::template(2)));
    }

    #[tokio::test]
    async fn load_normalizes_and_reports_kpis() {
        let api = FakeApi::default();
        let board = Dashboard::load(&api, RecordingUi::default())
            .await
            .unwrap()
            .with_clock(jan_10);
        let kpis = board.kpis();
        assert_eq!(kpis.today_percent, 50);
        assert_eq!(kpis.current_streak, 1);
        assert_eq!(board.level_view(HabitKind::Daily, "2023-12-31").percent, None);
    }

    #[test]
    fn loose_date_spelling_claims_the_same_checkbox() {
        let mut board = board();
        let loose = HabitRef { kind: HabitKind::Daily, key: "2024-1-10".into(), id: 2 };

        let older = board.begin_toggle(loose).unwrap();
        assert_eq!(older.target(), &HabitRef::daily(jan_10(), 2));
        assert_eq!(board.ui().views.last().unwrap().key, "2024-01-10");
        assert_eq!(
            board.begin_toggle(HabitRef::daily(jan_10(), 2)).unwrap_err(),
            MutationError::InFlight(HabitRef::daily(jan_10(), 2))
        );

        let failed = ClientError::Network("timed out".into());
        assert_eq!(board.settle_toggle(older, Err(failed)), MutationState::RolledBack);
        assert!(!board.snapshot().is_completed(jan_10(), 2));
        assert!(!board.is_in_flight(&HabitRef::daily(jan_10(), 2)));

        let newer = board.begin_toggle(HabitRef::daily(jan_10(), 2)).unwrap();
        assert_eq!(board.settle_toggle(newer, Ok(())), MutationState::Committed);
        assert!(board.snapshot().is_completed(jan_10(), 2));
    }

    #[test]
    fn toggle_on_inactive_day_is_not_found() {
        let mut board = board();
        let before_start = HabitRef::daily(day(2023, 12, 31), 1);
        assert_eq!(
            board.begin_toggle(before_start.clone()).unwrap_err(),
            MutationError::NotFound(before_start)
        );
        assert!(board.snapshot().daily_completions.get("2023-12-31").is_none());
    }

    #[tokio::test]
    async fn reload_waits_for_in_flight_toggle() {
        let api = FakeApi::default();
        let mut board = board();
        let target = HabitRef::daily(jan_10(), 2);

        let pending = board.begin_toggle(target.clone()).unwrap();
        assert_eq!(
            board.reload(&api).await.unwrap_err(),
            MutationError::InFlight(target)
        );
        assert!(api.calls().is_empty());

        let failed = ClientError::Network("connection reset".into());
        board.settle_toggle(pending, Err(failed));
        board.reload(&api).await.unwrap();
        assert_eq!(api.calls(), vec!["fetch"]);
        assert_eq!(board.snapshot(), &sample().normalized());
    }

    #[tokio::test]
    async fn reload_replaces_snapshot_and_redraws_selected_day() {
        let api = FakeApi::default();
        let mut board = Dashboard::new(Snapshot::default(), RecordingUi::default()).with_clock(jan_10);
        assert_eq!(board.level_view(HabitKind::Daily, "2024-01-10").percent, None);

        board.reload(&api).await.unwrap();
        assert_eq!(board.snapshot(), &sample().normalized());
        let view = board.ui().views.last().unwrap();
        assert_eq!(view.key, "2024-01-10");
        assert_eq!(view.percent, Some(50));
        assert_eq!(view.items.len(), 2);
    }

    #[tokio::test]
    async fn failed_reload_keeps_snapshot() {
        let api = FakeApi::failing();
        let mut board = board();
        let err = board.reload(&api).await.unwrap_err();
        assert!(matches!(err, MutationError::Client(ClientError::Server { status: 500, .. })));
        assert_eq!(board.snapshot(), &sample().normalized());
        assert!(board.ui().views.is_empty());
    }

    #[test]
    fn selecting_a_day_without_habits_shows_no_percent() {
        let mut board = board();
        board.select_date(day(2023, 12, 31));
        assert_eq!(board.selected_date(), day(2023, 12, 31));
        let view = board.ui().views.last().unwrap();
        assert_eq!(view.key, "2023-12-31");
        assert!(view.items.is_empty());
        assert_eq!(view.percent, None);

        board.select_date(day(2024, 1, 11));
        let view = board.ui().views.last().unwrap();
        assert_eq!(view.percent, Some(0));
        assert!(view.items.iter().all(|item| !item.completed));
    }

    #[test]
    fn calendar_scan_from_config_reaches_kpis() {
        let mut snapshot = Snapshot::default();
        snapshot.daily_templates.push(DailyTemplate {
            id: 1,
            name: "read".into(),
            start_date: day(2024, 1, 1),
            end_date: None,
        });
        for date in [day(2024, 1, 1), day(2024, 1, 2), day(2024, 1, 4)] {
            snapshot.set_completed(date, 1, true);
        }

        let recorded = Dashboard::new(snapshot.clone(), RecordingUi::default()).with_clock(jan_10);
        assert_eq!(recorded.kpis().longest_streak, 3);

        let config = BoardConfig {
            streak_scan: StreakScan::Calendar,
            ..BoardConfig::default()
        };
        let calendar = Dashboard::new(snapshot, RecordingUi::default())
            .with_clock(jan_10)
            .with_config(config);
        assert_eq!(calendar.config().streak_scan, StreakScan::Calendar);
        assert_eq!(calendar.kpis().longest_streak, 2);
    }

    #[test]
    fn period_navigation_steps_and_wraps() {
        let mut board = board();
        assert_eq!(board.period_key(PeriodKind::Weekly), "2024-W02");
        assert_eq!(board.period_key(PeriodKind::Monthly), "2024-01");
        assert_eq!(board.period_key(PeriodKind::Yearly), "2024");

        board.change_period(PeriodKind::Monthly, -1);
        assert_eq!(board.period_key(PeriodKind::Monthly), "2023-12");
        board.change_period(PeriodKind::Monthly, 13);
        assert_eq!(board.period_key(PeriodKind::Monthly), "2025-01");
        board.change_period(PeriodKind::Yearly, -1);
        assert_eq!(board.period_key(PeriodKind::Yearly), "2023");

        board.change_period(PeriodKind::Weekly, 1);
        let view = board.ui().views.last().unwrap();
        assert_eq!(view.key, "2024-W03");
        assert!(view.items.is_empty());
        board.change_period(PeriodKind::Weekly, -1);
        let view = board.ui().views.last().unwrap();
        assert_eq!((view.key.as_str(), view.items.len()), ("2024-W02", 1));

        board.select_period(PeriodKind::Weekly, day(2021, 1, 1));
        assert_eq!(board.period_key(PeriodKind::Weekly), "2020-W53");
        assert_eq!(board.period_key(PeriodKind::Monthly), "2025-01");
    }

    #[tokio::test]
    async fn new_habit_uses_shown_period() {
        let api = FakeApi::default();
        let mut board = board();
        board.change_period(PeriodKind::Weekly, 1);

        let input = board.new_habit(HabitKind::Period(PeriodKind::Weekly), "stretch");
        assert_eq!(input.key, "2024-W03");
        board.add_habit(&api, input).await.unwrap();
        assert_eq!(board.snapshot().bucket(PeriodKind::Weekly, "2024-W03")[0].name, "stretch");

        let daily = board.new_habit(HabitKind::Daily, "water plants");
        assert_eq!(daily.key, "2024-01-10");
    }

    #[test]
    fn export_is_pretty_json_named_after_today() {
        let board = board();
        let export = board.export_snapshot().unwrap();
        assert_eq!(export.file_name, "habit-data-2024-01-10.json");
        assert!(export.contents.contains("\n  \"dailyTemplates\": ["));
        let parsed: Snapshot = serde_json::from_str(&export.contents).unwrap();
        assert_eq!(&parsed, board.snapshot());
    }
}
