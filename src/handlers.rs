use crate::errors::AppError;
use crate::models::{
    Category, CompleteRequest, GroupQuery, Habit, HabitCard, HabitGroup, HabitRecord,
    MissedPrompt, NameRequest, NewHabit, StateResponse, StatsResponse, StatusRequest, SyncMode,
    ToggleRequest,
};
use crate::state::AppState;
use crate::stats::build_stats;
use crate::streak::today;
use crate::ui::render_index;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
    Form, Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

/// Cloud cards pull their habit's records before rendering. A failed pull
/// still renders from the store.
async fn load_card(state: &AppState, habit_id: &str, today: NaiveDate) -> Option<HabitCard> {
    if state.tracker.mode() == SyncMode::Cloud {
        if let Err(err) = state.tracker.load_habit_records(habit_id).await {
            warn!(habit_id, "failed to load records: {err}");
        }
    }
    state.tracker.card(habit_id, today).await
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let today = today();
    let data = state.tracker.snapshot().await;
    let mut cards = Vec::with_capacity(data.habits.len());
    for habit in &data.habits {
        if let Some(card) = load_card(&state, &habit.id, today).await {
            cards.push(card);
        }
    }
    let missed = state.missed.lock().await.pending().cloned();
    Html(render_index(
        today,
        state.tracker.mode(),
        &cards,
        missed.as_ref(),
        state.tracker.last_error().as_deref(),
    ))
}

pub async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    Json(state.tracker.state().await)
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<NameRequest>,
) -> Result<Json<Option<Category>>, AppError> {
    let category = state.tracker.create_category(&payload.name).await?;
    Ok(Json(category))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<NameRequest>,
) -> Result<Json<Category>, AppError> {
    state
        .tracker
        .update_category(&id, &payload.name)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("category not found"))
}

pub async fn remove_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.tracker.remove_category(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("category not found"))
    }
}

pub async fn create_habit(
    State(state): State<AppState>,
    Json(payload): Json<NewHabit>,
) -> Result<Json<Vec<Habit>>, AppError> {
    let habits = state.tracker.create_habit(payload).await?;
    Ok(Json(habits))
}

pub async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HabitCard>, AppError> {
    load_card(&state, &id, today())
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("habit not found"))
}

pub async fn remove_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.tracker.remove_habit(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("habit not found"))
    }
}

pub async fn complete_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CompleteRequest>,
) -> Result<Json<HabitRecord>, AppError> {
    state
        .tracker
        .complete_habit(&id, payload.date, payload.completed)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("habit not found"))
}

/// Today-gated toggle; other dates return the card unchanged.
pub async fn toggle_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<HabitCard>, AppError> {
    let today = today();
    state.tracker.toggle_cell(&id, payload.date, today).await?;
    state
        .tracker
        .card(&id, today)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("habit not found"))
}

#[derive(Serialize)]
pub struct LoadedRecords {
    pub added: usize,
}

pub async fn load_records(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LoadedRecords>, AppError> {
    let added = state.tracker.load_habit_records(&id).await?;
    Ok(Json(LoadedRecords { added }))
}

pub async fn get_groups(
    State(state): State<AppState>,
    Query(query): Query<GroupQuery>,
) -> Json<Vec<HabitGroup>> {
    let data = state.tracker.snapshot().await;
    Json(data.group_habits(query.category.as_deref()))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let data = state.tracker.snapshot().await;
    Json(build_stats(&data))
}

pub async fn get_missed(State(state): State<AppState>) -> Json<Option<MissedPrompt>> {
    Json(state.missed.lock().await.pending().cloned())
}

pub async fn set_missed_status(
    State(state): State<AppState>,
    Path(habit_id): Path<String>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<Option<MissedPrompt>>, AppError> {
    let mut missed = state.missed.lock().await;
    if !missed.set_status(&habit_id, payload.completed).await? {
        return Err(AppError::not_found("habit is not in the pending prompt"));
    }
    Ok(Json(missed.pending().cloned()))
}

#[derive(Serialize)]
pub struct SubmittedMissed {
    pub submitted: usize,
}

pub async fn submit_missed(State(state): State<AppState>) -> Result<Json<SubmittedMissed>, AppError> {
    let submitted = state.missed.lock().await.submit(&state.tracker).await?;
    Ok(Json(SubmittedMissed { submitted }))
}

pub async fn form_create_habit(
    State(state): State<AppState>,
    Form(mut form): Form<NewHabit>,
) -> Result<Redirect, AppError> {
    // Browsers submit an empty select as "".
    form.category_id = form.category_id.filter(|id| !id.trim().is_empty());
    state.tracker.create_habit(form).await?;
    Ok(Redirect::to("/"))
}

pub async fn form_toggle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(payload): Form<ToggleRequest>,
) -> Result<Redirect, AppError> {
    state.tracker.toggle_cell(&id, payload.date, today()).await?;
    Ok(Redirect::to("/"))
}
