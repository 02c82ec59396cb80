//! Apply-now, invert-on-failure edits of a [`Snapshot`].
//!
//! A [`Lens`] names one field of the snapshot. [`Optimistic`] writes a new
//! value through it, keeps the pre-image, and either commits or restores the
//! pre-image once the server has answered.

use crate::dates::parse_date_key;
use crate::models::{HabitKind, HabitRef, PeriodKind, Snapshot};
use chrono::NaiveDate;
use std::fmt;

pub trait Lens {
    type Value: Clone + PartialEq + fmt::Debug;

    /// `None` when the addressed field does not exist.
    fn get(&self, snapshot: &Snapshot) -> Option<Self::Value>;

    fn set(&self, snapshot: &mut Snapshot, value: Self::Value);
}

/// Completion of one daily template on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionLens {
    pub date: NaiveDate,
    pub template_id: i64,
}

impl Lens for CompletionLens {
    type Value = bool;

    /// `None` unless the template exists and is active on the date.
    fn get(&self, snapshot: &Snapshot) -> Option<bool> {
        if !snapshot.template(self.template_id)?.is_active_on(self.date) {
            return None;
        }
        Some(snapshot.is_completed(self.date, self.template_id))
    }

    fn set(&self, snapshot: &mut Snapshot, value: bool) {
        snapshot.set_completed(self.date, self.template_id, value);
    }
}

/// `completed` flag of one weekly/monthly/yearly habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodFlagLens {
    pub kind: PeriodKind,
    pub key: String,
    pub id: i64,
}

impl Lens for PeriodFlagLens {
    type Value = bool;

    fn get(&self, snapshot: &Snapshot) -> Option<bool> {
        snapshot
            .bucket(self.kind, &self.key)
            .iter()
            .find(|habit| habit.id == self.id)
            .map(|habit| habit.completed)
    }

    fn set(&self, snapshot: &mut Snapshot, value: bool) {
        if let Some(habit) = snapshot.period_habit_mut(self.kind, &self.key, self.id) {
            habit.completed = value;
        }
    }
}

/// The checkbox behind a [`HabitRef`], whichever checklist it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagLens {
    Daily(CompletionLens),
    Period(PeriodFlagLens),
}

impl FlagLens {
    /// `None` for a daily ref whose key is not a valid date.
    pub fn for_ref(target: &HabitRef) -> Option<Self> {
        match target.kind {
            HabitKind::Daily => Some(FlagLens::Daily(CompletionLens {
                date: parse_date_key(&target.key)?,
                template_id: target.id,
            })),
            HabitKind::Period(kind) => Some(FlagLens::Period(PeriodFlagLens {
                kind,
                key: target.key.clone(),
                id: target.id,
            })),
        }
    }

    /// The ref addressing this field, with the date key in canonical form.
    pub fn target(&self) -> HabitRef {
        match self {
            FlagLens::Daily(lens) => HabitRef::daily(lens.date, lens.template_id),
            FlagLens::Period(lens) => HabitRef::period(lens.kind, lens.key.clone(), lens.id),
        }
    }
}

impl Lens for FlagLens {
    type Value = bool;

    fn get(&self, snapshot: &Snapshot) -> Option<bool> {
        match self {
            FlagLens::Daily(lens) => lens.get(snapshot),
            FlagLens::Period(lens) => lens.get(snapshot),
        }
    }

    fn set(&self, snapshot: &mut Snapshot, value: bool) {
        match self {
            FlagLens::Daily(lens) => lens.set(snapshot, value),
            FlagLens::Period(lens) => lens.set(snapshot, value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// Written locally, request not yet sent.
    Applied,
    /// Request in flight.
    Pending,
    Committed,
    RolledBack,
}

#[derive(Debug)]
pub struct Optimistic<L: Lens> {
    lens: L,
    before: L::Value,
    after: L::Value,
    state: MutationState,
}

impl<L: Lens> Optimistic<L> {
    /// Writes `update(current)` through the lens. Returns `None`, leaving the
    /// snapshot untouched, when the field does not exist.
    pub fn apply(
        snapshot: &mut Snapshot,
        lens: L,
        update: impl FnOnce(&L::Value) -> L::Value,
    ) -> Option<Self> {
        let before = lens.get(snapshot)?;
        let after = update(&before);
        lens.set(snapshot, after.clone());
        Some(Self {
            lens,
            before,
            after,
            state: MutationState::Applied,
        })
    }

    pub fn after(&self) -> &L::Value {
        &self.after
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    pub fn mark_sent(&mut self) {
        if self.state == MutationState::Applied {
            self.state = MutationState::Pending;
        }
    }

    pub fn commit(&mut self) {
        self.state = MutationState::Committed;
    }

    /// Restores the pre-image. A no-op once committed or already rolled back.
    pub fn rollback(&mut self, snapshot: &mut Snapshot) {
        if matches!(self.state, MutationState::Applied | MutationState::Pending) {
            self.lens.set(snapshot, self.before.clone());
            self.state = MutationState::RolledBack;
        }
    }
}
