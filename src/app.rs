use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/state", get(handlers::get_state))
        .route("/api/history", get(handlers::get_history))
        .route("/api/counters", post(handlers::create_counter))
        .route("/api/counters/:id/increment", post(handlers::increment))
        .route("/api/counters/:id/decrement", post(handlers::decrement))
        .route("/api/counters/:id/reset", post(handlers::reset))
        .route("/api/counters/:id/delete", post(handlers::delete))
        .with_state(state)
}
