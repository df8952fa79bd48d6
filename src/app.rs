use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/habits", post(handlers::form_create_habit))
        .route("/habits/:id/toggle", post(handlers::form_toggle))
        .route("/api/state", get(handlers::get_state))
        .route("/api/categories", post(handlers::create_category))
        .route(
            "/api/categories/:id",
            put(handlers::update_category).delete(handlers::remove_category),
        )
        .route("/api/habits", post(handlers::create_habit))
        .route(
            "/api/habits/:id",
            get(handlers::get_card).delete(handlers::remove_habit),
        )
        .route("/api/habits/:id/complete", post(handlers::complete_habit))
        .route("/api/habits/:id/toggle", post(handlers::toggle_habit))
        .route("/api/habits/:id/records/refresh", post(handlers::load_records))
        .route("/api/groups", get(handlers::get_groups))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/missed", get(handlers::get_missed))
        .route("/api/missed/submit", post(handlers::submit_missed))
        .route("/api/missed/:habit_id", post(handlers::set_missed_status))
        .with_state(state)
}
