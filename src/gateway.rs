use crate::config::{RemoteConfig, Session};
use crate::errors::SyncError;
use crate::models::{Category, Habit, HabitInsert, HabitRecord, RecordInsert};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, instrument, warn};

const CATEGORIES: &str = "categories";
const HABITS: &str = "habits";
const HABIT_RECORDS: &str = "habit_records";

/// CRUD access to the hosted tables. Every method returns the row as stored
/// by the backend, with server-assigned ids and timestamps.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, SyncError>;
    async fn insert_category(&self, name: &str) -> Result<Category, SyncError>;
    async fn list_habits(&self, owner: &str) -> Result<Vec<Habit>, SyncError>;
    async fn insert_habit(&self, habit: &HabitInsert) -> Result<Habit, SyncError>;
    async fn list_records(&self, habit_id: &str) -> Result<Vec<HabitRecord>, SyncError>;
    async fn insert_record(&self, record: &RecordInsert) -> Result<HabitRecord, SyncError>;
    async fn update_record(&self, id: &str, completed: bool) -> Result<HabitRecord, SyncError>;
}

/// PostgREST client for the hosted backend.
pub struct RestGateway {
    client: Client,
    base_url: Url,
    api_key: String,
    bearer: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Serialize)]
struct CategoryInsert<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct RecordUpdate {
    completed: bool,
}

impl RestGateway {
    pub fn new(config: &RemoteConfig, session: Option<&Session>) -> Result<Self, SyncError> {
        let raw = config
            .url
            .as_deref()
            .ok_or_else(|| SyncError::Configuration("HABIT_REMOTE_URL is not set".into()))?;

        let base_url = Url::parse(raw)
            .map_err(|err| SyncError::Configuration(format!("invalid backend url {raw}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::Configuration(format!("invalid backend url {raw}")));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| SyncError::Configuration(format!("failed to build HTTP client: {err}")))?;

        let bearer = session
            .and_then(|s| s.access_token.clone())
            .unwrap_or_else(|| config.api_key.clone());

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            bearer,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url.as_str().trim_end_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
    }

    async fn list<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, SyncError> {
        let request = self
            .authorize(self.client.get(self.table_url(table)))
            .query(&[("select", "*")])
            .query(query);
        read_json(table, request).await
    }

    async fn insert_one<B, T>(&self, table: &str, body: &B) -> Result<T, SyncError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self
            .authorize(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .json(body);
        read_json(table, request).await
    }

    async fn update_one<B, T>(&self, table: &str, id: &str, body: &B) -> Result<T, SyncError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self
            .authorize(self.client.patch(self.table_url(table)))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .json(body);
        read_json(table, request).await
    }
}

async fn read_json<T: DeserializeOwned>(table: &str, request: RequestBuilder) -> Result<T, SyncError> {
    let response = request.send().await.map_err(|err| {
        warn!(table, "request to backend failed: {err}");
        SyncError::Remote(format!("request to {table} failed: {err}"))
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(table, %status, "backend rejected request: {body}");
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| format!("{table} request failed with status {status}"));
        return Err(SyncError::Remote(message));
    }

    response
        .json()
        .await
        .map_err(|err| SyncError::Remote(format!("unexpected {table} response: {err}")))
}

#[async_trait]
impl RemoteGateway for RestGateway {
    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<Category>, SyncError> {
        self.list(CATEGORIES, &[("order", "name.asc".to_string())]).await
    }

    #[instrument(skip(self))]
    async fn insert_category(&self, name: &str) -> Result<Category, SyncError> {
        self.insert_one(CATEGORIES, &CategoryInsert { name }).await
    }

    #[instrument(skip(self))]
    async fn list_habits(&self, owner: &str) -> Result<Vec<Habit>, SyncError> {
        self.list(
            HABITS,
            &[
                ("user_id", format!("eq.{owner}")),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self, habit), fields(name = %habit.name))]
    async fn insert_habit(&self, habit: &HabitInsert) -> Result<Habit, SyncError> {
        self.insert_one(HABITS, habit).await
    }

    #[instrument(skip(self))]
    async fn list_records(&self, habit_id: &str) -> Result<Vec<HabitRecord>, SyncError> {
        let records: Vec<HabitRecord> = self
            .list(
                HABIT_RECORDS,
                &[
                    ("habit_id", format!("eq.{habit_id}")),
                    ("order", "date.desc".to_string()),
                ],
            )
            .await?;
        debug!(count = records.len(), "fetched habit records");
        Ok(records)
    }

    #[instrument(skip(self, record), fields(habit_id = %record.habit_id, date = %record.date))]
    async fn insert_record(&self, record: &RecordInsert) -> Result<HabitRecord, SyncError> {
        self.insert_one(HABIT_RECORDS, record).await
    }

    #[instrument(skip(self))]
    async fn update_record(&self, id: &str, completed: bool) -> Result<HabitRecord, SyncError> {
        self.update_one(HABIT_RECORDS, id, &RecordUpdate { completed })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn remote(url: Option<&str>) -> RemoteConfig {
        RemoteConfig {
            url: url.map(str::to_string),
            api_key: "anon".into(),
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn missing_url_is_a_configuration_error() {
        let err = RestGateway::new(&remote(None), None).err().unwrap();
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[test]
    fn invalid_url_is_a_configuration_error() {
        let err = RestGateway::new(&remote(Some("not a url")), None).err().unwrap();
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[test]
    fn table_urls_ignore_trailing_slash() {
        let gateway = RestGateway::new(&remote(Some("https://db.example.test/")), None).unwrap();
        assert_eq!(
            gateway.table_url(HABITS),
            "https://db.example.test/rest/v1/habits"
        );
    }

    #[test]
    fn session_token_is_preferred_over_api_key() {
        let session = Session {
            user_id: "u1".into(),
            access_token: Some("jwt".into()),
        };
        let gateway =
            RestGateway::new(&remote(Some("https://db.example.test")), Some(&session)).unwrap();
        assert_eq!(gateway.bearer, "jwt");

        let anonymous = RestGateway::new(&remote(Some("https://db.example.test")), None).unwrap();
        assert_eq!(anonymous.bearer, "anon");
    }
}
