//! "Fill in yesterday" reminder, run once when a session starts.
//!
//! Kept apart from the habit snapshot: it reads the store but only writes its
//! own small file (last visit date and the pending prompt).

use crate::errors::SyncError;
use crate::models::{HabitData, MissedPrompt, VisitState};
use crate::storage::{load_data, persist_data};
use crate::tracker::HabitTracker;
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Updates `state` for a visit on `today` and returns the prompt to show, if any.
///
/// A pending prompt is returned untouched and the visit date is left as is.
/// Otherwise, when the previous visit was on another day, every habit without
/// a completed record for yesterday goes into a new prompt.
pub fn reconcile(state: &mut VisitState, data: &HabitData, today: NaiveDate) -> Option<MissedPrompt> {
    if let Some(prompt) = &mut state.pending {
        for habit in &prompt.habits {
            prompt.statuses.entry(habit.id.clone()).or_insert(false);
        }
        return Some(prompt.clone());
    }

    let returning = state.last_visit_date.is_some_and(|last| last != today);
    if returning && !data.habits.is_empty() {
        let yesterday = today - Duration::days(1);
        let missed: Vec<_> = data
            .habits
            .iter()
            .filter(|habit| {
                !data
                    .find_record(&habit.id, yesterday)
                    .is_some_and(|record| record.completed)
            })
            .cloned()
            .collect();

        if !missed.is_empty() {
            let statuses: BTreeMap<String, bool> =
                missed.iter().map(|habit| (habit.id.clone(), false)).collect();
            state.pending = Some(MissedPrompt {
                date: yesterday,
                habits: missed,
                statuses,
            });
        }
    }

    state.last_visit_date = Some(today);
    state.pending.clone()
}

pub struct MissedHabits {
    path: Option<PathBuf>,
    state: VisitState,
}

impl MissedHabits {
    pub fn new(state: VisitState, path: Option<PathBuf>) -> Self {
        Self { path, state }
    }

    pub async fn open(path: PathBuf) -> Self {
        let state = load_data(&path).await;
        Self::new(state, Some(path))
    }

    pub fn pending(&self) -> Option<&MissedPrompt> {
        self.state.pending.as_ref()
    }

    async fn save(&self) -> Result<(), SyncError> {
        if let Some(path) = &self.path {
            persist_data(path, &self.state).await?;
        }
        Ok(())
    }

    /// Runs the session-start check against the tracker's current data.
    pub async fn check(
        &mut self,
        tracker: &HabitTracker,
        today: NaiveDate,
    ) -> Result<Option<MissedPrompt>, SyncError> {
        let data = tracker.snapshot().await;
        let prompt = reconcile(&mut self.state, &data, today);
        self.save().await?;
        if let Some(prompt) = &prompt {
            info!(date = %prompt.date, missed = prompt.habits.len(), "missed habits pending");
        }
        Ok(prompt)
    }

    /// Records the user's answer for one habit of the pending prompt.
    pub async fn set_status(&mut self, habit_id: &str, completed: bool) -> Result<bool, SyncError> {
        let Some(prompt) = &mut self.state.pending else {
            return Ok(false);
        };
        if !prompt.habits.iter().any(|habit| habit.id == habit_id) {
            return Ok(false);
        }
        prompt.statuses.insert(habit_id.to_string(), completed);
        self.save().await?;
        Ok(true)
    }

    /// Writes every answer of the pending prompt for the prompt's date and
    /// clears it. On failure the prompt stays pending so it can be resubmitted.
    pub async fn submit(&mut self, tracker: &HabitTracker) -> Result<usize, SyncError> {
        let Some(prompt) = self.state.pending.clone() else {
            return Ok(0);
        };

        for habit in &prompt.habits {
            let completed = prompt.statuses.get(&habit.id).copied().unwrap_or(false);
            tracker.complete_habit(&habit.id, prompt.date, completed).await?;
        }

        self.state.pending = None;
        self.save().await?;
        info!(date = %prompt.date, count = prompt.habits.len(), "missed habits submitted");
        Ok(prompt.habits.len())
    }
}
