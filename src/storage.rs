use crate::errors::StorageError;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::error;

/// Loads a JSON file, falling back to the default value when it is missing or
/// unreadable.
pub async fn load_data<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!(path = %path.display(), "failed to parse data file: {err}");
                T::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => T::default(),
        Err(err) => {
            error!(path = %path.display(), "failed to read data file: {err}");
            T::default()
        }
    }
}

pub async fn persist_data<T: Serialize>(path: &Path, data: &T) -> Result<(), StorageError> {
    let payload = serde_json::to_vec_pretty(data)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(path, payload).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HabitData, VisitState};
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("habit_tracker_storage_{}_{}_{name}", std::process::id(), nanos));
        path
    }

    #[tokio::test]
    async fn missing_file_loads_empty_state() {
        let data: HabitData = load_data(&temp_path("missing.json")).await;
        assert!(data.habits.is_empty());
        assert!(data.categories.is_empty());
        assert!(data.records.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty_state() {
        let path = temp_path("corrupt.json");
        fs::write(&path, b"{ not json").await.unwrap();

        let data: HabitData = load_data(&path).await;
        assert!(data.habits.is_empty());

        let visit: VisitState = load_data(&path).await;
        assert_eq!(visit, VisitState::default());
        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn persisted_visit_state_loads_back() {
        let path = temp_path("nested").join("visit.json");
        let state = VisitState {
            last_visit_date: chrono::NaiveDate::from_ymd_opt(2026, 3, 4),
            pending: None,
        };

        persist_data(&path, &state).await.unwrap();
        let loaded: VisitState = load_data(&path).await;
        assert_eq!(loaded, state);
        let _ = fs::remove_dir_all(path.parent().unwrap()).await;
    }
}
