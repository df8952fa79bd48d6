use crate::config::{Config, Session};
use crate::errors::SyncError;
use crate::gateway::{RemoteGateway, RestGateway};
use crate::models::{Category, Habit, HabitInsert, HabitRecord, RecordInsert, SyncMode};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Where the authoritative copy of a change is produced. Both implementations
/// hand back fully formed rows; merging them into the store is the caller's
/// job and is identical for both.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    fn mode(&self) -> SyncMode;

    async fn create_category(&self, name: &str) -> Result<Category, SyncError>;
    async fn rename_category(&self, id: &str, name: &str) -> Result<(), SyncError>;
    async fn delete_category(&self, id: &str) -> Result<(), SyncError>;
    async fn create_habit(&self, habit: HabitInsert) -> Result<Habit, SyncError>;
    async fn insert_record(&self, record: RecordInsert) -> Result<HabitRecord, SyncError>;
    async fn update_record(&self, record: &HabitRecord, completed: bool) -> Result<HabitRecord, SyncError>;

    /// Rows the backend knows about that the store may not. Empty locally.
    async fn fetch_categories(&self) -> Result<Vec<Category>, SyncError>;
    async fn fetch_habits(&self) -> Result<Vec<Habit>, SyncError>;
    async fn fetch_records(&self, habit_id: &str) -> Result<Vec<HabitRecord>, SyncError>;
}

/// Unauthenticated mode: rows are synthesized in-process.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalBackend;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl SyncBackend for LocalBackend {
    fn mode(&self) -> SyncMode {
        SyncMode::Local
    }

    async fn create_category(&self, name: &str) -> Result<Category, SyncError> {
        Ok(Category {
            id: new_id(),
            name: name.to_string(),
            created_at: Utc::now(),
        })
    }

    async fn rename_category(&self, _id: &str, _name: &str) -> Result<(), SyncError> {
        Ok(())
    }

    async fn delete_category(&self, _id: &str) -> Result<(), SyncError> {
        Ok(())
    }

    async fn create_habit(&self, habit: HabitInsert) -> Result<Habit, SyncError> {
        Ok(Habit {
            id: new_id(),
            user_id: None,
            category_id: habit.category_id,
            name: habit.name,
            description: habit.description,
            frequency: habit.frequency,
            created_at: Utc::now(),
        })
    }

    async fn insert_record(&self, record: RecordInsert) -> Result<HabitRecord, SyncError> {
        Ok(HabitRecord {
            id: new_id(),
            habit_id: record.habit_id,
            date: record.date,
            completed: record.completed,
            created_at: Utc::now(),
        })
    }

    async fn update_record(&self, record: &HabitRecord, completed: bool) -> Result<HabitRecord, SyncError> {
        Ok(HabitRecord {
            completed,
            ..record.clone()
        })
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, SyncError> {
        Ok(Vec::new())
    }

    async fn fetch_habits(&self) -> Result<Vec<Habit>, SyncError> {
        Ok(Vec::new())
    }

    async fn fetch_records(&self, _habit_id: &str) -> Result<Vec<HabitRecord>, SyncError> {
        Ok(Vec::new())
    }
}

/// Authenticated mode: every change goes through the remote gateway first.
/// Without a gateway or a session each call fails fast, before any request.
pub struct CloudBackend<G> {
    gateway: Option<G>,
    session: Option<Session>,
    setup_error: Option<String>,
}

impl<G: RemoteGateway> CloudBackend<G> {
    pub fn new(gateway: G, session: Option<Session>) -> Self {
        Self {
            gateway: Some(gateway),
            session,
            setup_error: None,
        }
    }

    /// A cloud backend whose gateway could not be built.
    pub fn unconfigured(reason: impl Into<String>, session: Option<Session>) -> Self {
        Self {
            gateway: None,
            session,
            setup_error: Some(reason.into()),
        }
    }

    fn gateway(&self) -> Result<&G, SyncError> {
        self.gateway.as_ref().ok_or_else(|| {
            SyncError::Configuration(
                self.setup_error
                    .clone()
                    .unwrap_or_else(|| "no remote gateway".to_string()),
            )
        })
    }

    fn owner(&self) -> Result<&str, SyncError> {
        self.session
            .as_ref()
            .map(|session| session.user_id.as_str())
            .ok_or_else(|| SyncError::Configuration("user not authenticated".into()))
    }
}

#[async_trait]
impl<G: RemoteGateway> SyncBackend for CloudBackend<G> {
    fn mode(&self) -> SyncMode {
        SyncMode::Cloud
    }

    async fn create_category(&self, name: &str) -> Result<Category, SyncError> {
        let gateway = self.gateway()?;
        self.owner()?;
        gateway.insert_category(name).await
    }

    async fn rename_category(&self, _id: &str, _name: &str) -> Result<(), SyncError> {
        Err(SyncError::Unsupported {
            operation: "editing a category",
        })
    }

    async fn delete_category(&self, _id: &str) -> Result<(), SyncError> {
        Err(SyncError::Unsupported {
            operation: "deleting a category",
        })
    }

    async fn create_habit(&self, habit: HabitInsert) -> Result<Habit, SyncError> {
        let gateway = self.gateway()?;
        let owner = self.owner()?;
        let habit = HabitInsert {
            user_id: Some(owner.to_string()),
            ..habit
        };
        gateway.insert_habit(&habit).await
    }

    async fn insert_record(&self, record: RecordInsert) -> Result<HabitRecord, SyncError> {
        let gateway = self.gateway()?;
        self.owner()?;
        gateway.insert_record(&record).await
    }

    async fn update_record(&self, record: &HabitRecord, completed: bool) -> Result<HabitRecord, SyncError> {
        let gateway = self.gateway()?;
        self.owner()?;
        gateway.update_record(&record.id, completed).await
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, SyncError> {
        let gateway = self.gateway()?;
        self.owner()?;
        gateway.list_categories().await
    }

    async fn fetch_habits(&self) -> Result<Vec<Habit>, SyncError> {
        let gateway = self.gateway()?;
        let owner = self.owner()?;
        gateway.list_habits(owner).await
    }

    async fn fetch_records(&self, habit_id: &str) -> Result<Vec<HabitRecord>, SyncError> {
        let gateway = self.gateway()?;
        self.owner()?;
        gateway.list_records(habit_id).await
    }
}

/// Picks the backend for the whole session: cloud when a user is signed in,
/// local otherwise.
pub fn select_backend(config: &Config) -> Arc<dyn SyncBackend> {
    match &config.session {
        Some(session) => match RestGateway::new(&config.remote, Some(session)) {
            Ok(gateway) => {
                info!(user_id = %session.user_id, "using cloud sync");
                Arc::new(CloudBackend::new(gateway, Some(session.clone())))
            }
            Err(err) => {
                warn!("cloud sync unavailable: {err}");
                Arc::new(CloudBackend::<RestGateway>::unconfigured(
                    err.to_string(),
                    Some(session.clone()),
                ))
            }
        },
        None => {
            info!("using local storage");
            Arc::new(LocalBackend)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;
    use crate::models::Frequency;
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config(url: Option<&str>, user: Option<&str>) -> Config {
        Config {
            port: 0,
            data_path: PathBuf::from("state.json"),
            visit_path: PathBuf::from("visit.json"),
            remote: RemoteConfig {
                url: url.map(str::to_string),
                api_key: String::new(),
                timeout: Duration::from_secs(1),
            },
            session: user.map(|user_id| Session {
                user_id: user_id.to_string(),
                access_token: None,
            }),
        }
    }

    #[test]
    fn mode_is_chosen_by_session() {
        assert_eq!(select_backend(&config(None, None)).mode(), SyncMode::Local);
        assert_eq!(
            select_backend(&config(Some("https://db.example.test"), Some("u1"))).mode(),
            SyncMode::Cloud
        );
    }

    #[tokio::test]
    async fn signed_in_without_backend_fails_fast() {
        let backend = select_backend(&config(None, Some("u1")));
        assert_eq!(backend.mode(), SyncMode::Cloud);

        let err = backend.create_category("Health").await.unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
        let err = backend.fetch_records("h1").await.unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[tokio::test]
    async fn local_backend_synthesizes_rows() {
        let backend = LocalBackend;
        let habit = backend
            .create_habit(HabitInsert {
                user_id: Some("ignored".into()),
                category_id: None,
                name: "Run".into(),
                description: None,
                frequency: Frequency::Weekly,
            })
            .await
            .unwrap();
        assert_eq!(habit.user_id, None);
        assert_eq!(habit.frequency, Frequency::Weekly);
        assert!(!habit.id.is_empty());

        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let record = backend
            .insert_record(RecordInsert {
                habit_id: habit.id.clone(),
                date,
                completed: true,
            })
            .await
            .unwrap();
        let updated = backend.update_record(&record, false).await.unwrap();
        assert_eq!(updated.id, record.id);
        assert!(!updated.completed);
    }
}
