use crate::reminder::MissedHabits;
use crate::tracker::HabitTracker;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub tracker: HabitTracker,
    pub missed: Arc<Mutex<MissedHabits>>,
}

impl AppState {
    pub fn new(tracker: HabitTracker, missed: MissedHabits) -> Self {
        Self {
            tracker,
            missed: Arc::new(Mutex::new(missed)),
        }
    }
}
