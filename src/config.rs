use std::{env, path::PathBuf, time::Duration};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/state.json";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Authenticated user. Held in memory only, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: Option<String>,
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub visit_path: PathBuf,
    pub remote: RemoteConfig,
    pub session: Option<Session>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = var("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let data_path = var("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

        let visit_path = var("APP_VISIT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_path.with_file_name("visit.json"));

        let timeout = var("HABIT_REMOTE_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let remote = RemoteConfig {
            url: var("HABIT_REMOTE_URL"),
            api_key: var("HABIT_REMOTE_KEY").unwrap_or_default(),
            timeout: Duration::from_secs(timeout),
        };

        let session = var("HABIT_USER_ID").map(|user_id| Session {
            user_id,
            access_token: var("HABIT_ACCESS_TOKEN"),
        });

        Self {
            port,
            data_path,
            visit_path,
            remote,
            session,
        }
    }
}
