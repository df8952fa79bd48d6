use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to write data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode data file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of a sync operation. Validation problems never show up here: the
/// tracker rejects those before dispatching.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote backend not configured: {0}")]
    Configuration(String),

    #[error("{0}")]
    Remote(String),

    #[error("{operation} is not supported in cloud mode")]
    Unsupported { operation: &'static str },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Whether the message should be retained for the user until the next attempt.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, SyncError::Storage(_))
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        let status = match &err {
            SyncError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            SyncError::Remote(_) => StatusCode::BAD_GATEWAY,
            SyncError::Unsupported { .. } => StatusCode::NOT_IMPLEMENTED,
            SyncError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
