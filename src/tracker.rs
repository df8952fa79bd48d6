use crate::errors::SyncError;
use crate::models::{
    Category, Habit, HabitCard, HabitData, HabitInsert, HabitRecord, NewHabit, RecordInsert,
    StateResponse, SyncMode,
};
use crate::storage::{load_data, persist_data};
use crate::streak::{build_card, dates_to_show, is_completed};
use crate::sync::SyncBackend;
use chrono::NaiveDate;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Entry point for every habit operation. Validates input, dispatches to the
/// session's backend, merges the returned rows into the store and flushes the
/// snapshot. The store lock is never held across a backend call.
#[derive(Clone)]
pub struct HabitTracker {
    data: Arc<Mutex<HabitData>>,
    backend: Arc<dyn SyncBackend>,
    data_path: Option<PathBuf>,
    last_error: Arc<StdMutex<Option<String>>>,
}

impl HabitTracker {
    pub fn new(backend: Arc<dyn SyncBackend>, data: HabitData, data_path: Option<PathBuf>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            backend,
            data_path,
            last_error: Arc::new(StdMutex::new(None)),
        }
    }

    /// Loads the persisted snapshot (empty when missing or corrupt).
    pub async fn open(backend: Arc<dyn SyncBackend>, data_path: PathBuf) -> Self {
        let data = load_data(&data_path).await;
        Self::new(backend, data, Some(data_path))
    }

    pub fn mode(&self) -> SyncMode {
        self.backend.mode()
    }

    pub async fn snapshot(&self) -> HabitData {
        self.data.lock().await.clone()
    }

    pub async fn state(&self) -> StateResponse {
        let data = self.snapshot().await;
        StateResponse {
            mode: self.mode(),
            categories: data.categories,
            habits: data.habits,
            records: data.records,
            error: self.last_error(),
        }
    }

    /// Message of the last failed backend call, kept until the next attempt.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn set_error(&self, message: Option<String>) {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = message;
        }
    }

    async fn call<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T, SyncError>>,
    ) -> Result<T, SyncError> {
        self.set_error(None);
        let result = fut.await;
        if let Err(err) = &result {
            warn!(operation, "sync failed: {err}");
            if err.is_user_facing() {
                self.set_error(Some(err.to_string()));
            }
        }
        result
    }

    async fn flush(&self, data: &HabitData) -> Result<(), SyncError> {
        if let Some(path) = &self.data_path {
            persist_data(path, data).await?;
        }
        Ok(())
    }

    pub async fn create_category(&self, name: &str) -> Result<Option<Category>, SyncError> {
        let name = name.trim();
        if name.is_empty() {
            debug!("ignoring category with empty name");
            return Ok(None);
        }

        let category = self
            .call("create_category", self.backend.create_category(name))
            .await?;

        let mut data = self.data.lock().await;
        data.upsert_category(category.clone());
        self.flush(&data).await?;
        info!(id = %category.id, "category created");
        Ok(Some(category))
    }

    /// Renames a category. A blank name leaves it unchanged; `None` means the
    /// store has no such category.
    pub async fn update_category(&self, id: &str, name: &str) -> Result<Option<Category>, SyncError> {
        let name = name.trim();
        if name.is_empty() {
            debug!(id, "ignoring rename to empty name");
            return Ok(self.data.lock().await.category(id).cloned());
        }

        self.call("update_category", self.backend.rename_category(id, name))
            .await?;

        let mut data = self.data.lock().await;
        let updated = data.rename_category(id, name);
        if updated.is_some() {
            self.flush(&data).await?;
        }
        Ok(updated)
    }

    pub async fn remove_category(&self, id: &str) -> Result<bool, SyncError> {
        self.call("remove_category", self.backend.delete_category(id))
            .await?;

        let mut data = self.data.lock().await;
        let removed = data.remove_category(id);
        self.flush(&data).await?;
        if removed {
            info!(id, "category removed");
        }
        Ok(removed)
    }

    /// Creates one habit per non-blank line of `fields.name`, all sharing the
    /// remaining fields.
    pub async fn create_habit(&self, fields: NewHabit) -> Result<Vec<Habit>, SyncError> {
        let names = split_names(&fields.name);
        if names.is_empty() {
            debug!("ignoring habit with empty name");
            return Ok(Vec::new());
        }

        let description = fields
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let mut created = Vec::with_capacity(names.len());
        for name in names {
            let insert = HabitInsert {
                user_id: None,
                category_id: fields.category_id.clone(),
                name,
                description: description.clone(),
                frequency: fields.frequency,
            };
            let habit = self
                .call("create_habit", self.backend.create_habit(insert))
                .await?;

            let mut data = self.data.lock().await;
            data.upsert_habit(habit.clone());
            self.flush(&data).await?;
            created.push(habit);
        }

        info!(count = created.len(), "habits created");
        Ok(created)
    }

    /// Deletes the habit and its records from the store only, whatever the mode.
    pub async fn remove_habit(&self, id: &str) -> Result<bool, SyncError> {
        let mut data = self.data.lock().await;
        let removed = data.remove_habit(id);
        self.flush(&data).await?;
        if removed {
            info!(id, "habit removed");
        }
        Ok(removed)
    }

    /// Sets completion of `habit_id` on `date`, updating the existing record
    /// for that day or creating one. Unknown habits are ignored.
    pub async fn complete_habit(
        &self,
        habit_id: &str,
        date: NaiveDate,
        completed: bool,
    ) -> Result<Option<HabitRecord>, SyncError> {
        let existing = {
            let data = self.data.lock().await;
            if data.habit(habit_id).is_none() {
                debug!(habit_id, "ignoring completion for unknown habit");
                return Ok(None);
            }
            data.find_record(habit_id, date).cloned()
        };

        let record = match existing {
            Some(record) => {
                self.call(
                    "complete_habit",
                    self.backend.update_record(&record, completed),
                )
                .await?
            }
            None => {
                let insert = RecordInsert {
                    habit_id: habit_id.to_string(),
                    date,
                    completed,
                };
                self.call("complete_habit", self.backend.insert_record(insert))
                    .await?
            }
        };

        let mut data = self.data.lock().await;
        data.apply_record(record.clone());
        self.flush(&data).await?;
        Ok(Some(record))
    }

    /// Flips the completion of a window cell. Only the cell flagged as today
    /// is editable; any other date is a no-op.
    pub async fn toggle_cell(
        &self,
        habit_id: &str,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Option<HabitRecord>, SyncError> {
        let (frequency, completed) = {
            let data = self.data.lock().await;
            let Some(habit) = data.habit(habit_id) else {
                return Ok(None);
            };
            (habit.frequency, is_completed(&data.records_for(habit_id), date))
        };

        let editable = dates_to_show(frequency, today)
            .iter()
            .any(|cell| cell.date == date && cell.is_today);
        if !editable {
            debug!(habit_id, %date, "ignoring toggle outside today");
            return Ok(None);
        }

        self.complete_habit(habit_id, date, !completed).await
    }

    /// Pulls the habit's records from the backend, adding only ids the store
    /// does not have yet. Returns how many were added.
    pub async fn load_habit_records(&self, habit_id: &str) -> Result<usize, SyncError> {
        if self.mode() == SyncMode::Local {
            return Ok(0);
        }

        let fetched = self
            .call("load_habit_records", self.backend.fetch_records(habit_id))
            .await?;

        let mut data = self.data.lock().await;
        let added = data.merge_records(fetched);
        if added > 0 {
            self.flush(&data).await?;
        }
        debug!(habit_id, added, "merged habit records");
        Ok(added)
    }

    /// Session-start load of categories, the owner's habits and each habit's
    /// records. Categories and habits overwrite or append by id; records merge
    /// like `load_habit_records`. Nothing is applied unless every fetch succeeds.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        if self.mode() == SyncMode::Local {
            return Ok(());
        }

        let categories = self
            .call("refresh", self.backend.fetch_categories())
            .await?;
        let habits = self.call("refresh", self.backend.fetch_habits()).await?;
        let mut records = Vec::new();
        for habit in &habits {
            records.extend(
                self.call("refresh", self.backend.fetch_records(&habit.id))
                    .await?,
            );
        }

        let mut data = self.data.lock().await;
        for category in categories {
            data.upsert_category(category);
        }
        for habit in habits {
            data.upsert_habit(habit);
        }
        let added = data.merge_records(records);
        self.flush(&data).await?;
        info!(
            categories = data.categories.len(),
            habits = data.habits.len(),
            records = added,
            "loaded remote habits"
        );
        Ok(())
    }

    pub async fn card(&self, habit_id: &str, today: NaiveDate) -> Option<HabitCard> {
        let data = self.data.lock().await;
        let habit = data.habit(habit_id)?;
        let category = habit
            .category_id
            .as_deref()
            .and_then(|id| data.category(id));
        Some(build_card(habit, category, &data.records_for(habit_id), today))
    }
}

fn split_names(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
