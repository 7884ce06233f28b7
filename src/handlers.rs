use crate::confirm::Preconfirmed;
use crate::errors::AppError;
use crate::models::{ConfirmRequest, CounterId, CreateCounterRequest, HistoryParams};
use crate::render::{FullRefresh, HistoryDay, RenderSignal};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

pub async fn get_state(State(state): State<AppState>) -> Json<FullRefresh> {
    let tracker = state.tracker.lock().await;
    Json(tracker.full_refresh())
}

pub async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Json<Vec<HistoryDay>> {
    let tracker = state.tracker.lock().await;
    Json(tracker.history(params.date, params.counter))
}

pub async fn create_counter(
    State(state): State<AppState>,
    Json(payload): Json<CreateCounterRequest>,
) -> Result<Response, AppError> {
    let signal = state
        .with_tracker(move |tracker| tracker.create(&payload.name))
        .await?;
    Ok(respond(signal))
}

pub async fn increment(
    State(state): State<AppState>,
    Path(id): Path<CounterId>,
) -> Result<Json<RenderSignal>, AppError> {
    let signal = state
        .with_tracker(move |tracker| tracker.increment(id))
        .await??;
    Ok(Json(signal))
}

pub async fn decrement(
    State(state): State<AppState>,
    Path(id): Path<CounterId>,
) -> Result<Response, AppError> {
    let signal = state
        .with_tracker(move |tracker| tracker.decrement(id))
        .await??;
    Ok(respond(signal))
}

pub async fn reset(
    State(state): State<AppState>,
    Path(id): Path<CounterId>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Response, AppError> {
    let mut answer = Preconfirmed(payload.confirm);
    let signal = state
        .with_tracker(move |tracker| tracker.reset_counter(id, &mut answer))
        .await??;
    Ok(respond(signal))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<CounterId>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Response, AppError> {
    let mut answer = Preconfirmed(payload.confirm);
    let signal = state
        .with_tracker(move |tracker| tracker.delete_counter(id, &mut answer))
        .await??;
    Ok(respond(signal))
}

/// No-ops answer 204 so clients can skip the redraw.
fn respond(signal: Option<RenderSignal>) -> Response {
    match signal {
        Some(signal) => Json(signal).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
