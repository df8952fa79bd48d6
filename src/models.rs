use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A tracked habit. `user_id` is the owner in cloud mode and `None` locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub user_id: Option<String>,
    pub category_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub created_at: DateTime<Utc>,
}

/// Completion marker for one habit on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitRecord {
    pub id: String,
    pub habit_id: String,
    pub date: NaiveDate,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Everything the store owns. This is also the persisted snapshot, so it must
/// never carry session data.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HabitData {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub records: Vec<HabitRecord>,
}

/// Fields shared by every habit created from one submission.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NewHabit {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub category_id: Option<String>,
}

/// A single habit ready to be created by a backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitInsert {
    pub user_id: Option<String>,
    pub category_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordInsert {
    pub habit_id: String,
    pub date: NaiveDate,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Local,
    Cloud,
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub date: NaiveDate,
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub completed: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct GroupQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub mode: SyncMode,
    pub categories: Vec<Category>,
    pub habits: Vec<Habit>,
    pub records: Vec<HabitRecord>,
    pub error: Option<String>,
}

/// One cell of a habit's 7-day strip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub day_label: String,
    pub label: String,
    pub key: String,
    pub is_today: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardCell {
    #[serde(flatten)]
    pub cell: DayCell,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitCard {
    pub habit: Habit,
    pub category: Option<Category>,
    pub cells: Vec<CardCell>,
    pub streak: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitGroup {
    pub category: Option<Category>,
    pub habits: Vec<Habit>,
}

#[derive(Debug, Serialize)]
pub struct HabitStreak {
    pub habit_id: String,
    pub name: String,
    pub frequency: Frequency,
    pub completed_count: u64,
    pub streak: u32,
}

#[derive(Debug, Serialize)]
pub struct MostConsistent {
    pub habit_id: String,
    pub name: String,
    pub completed_count: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_habits: usize,
    pub total_completed: usize,
    pub completion_rate: u32,
    pub most_consistent: Option<MostConsistent>,
    pub habits: Vec<HabitStreak>,
}

/// Pending "fill in yesterday" prompt, persisted until submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissedPrompt {
    pub date: NaiveDate,
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub statuses: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VisitState {
    #[serde(default)]
    pub last_visit_date: Option<NaiveDate>,
    #[serde(default)]
    pub pending: Option<MissedPrompt>,
}
