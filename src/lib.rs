pub mod app;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod reminder;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;
pub mod streak;
pub mod sync;
pub mod tracker;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use errors::{AppError, SyncError};
pub use reminder::MissedHabits;
pub use state::AppState;
pub use sync::{select_backend, SyncBackend};
pub use tracker::HabitTracker;
