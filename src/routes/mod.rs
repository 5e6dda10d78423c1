//! Router assembly.

pub mod api;
pub mod identity;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

#[must_use]
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/canvas", get(api::get_canvas))
        .route("/api/cooldown", get(api::get_cooldown))
        .route("/api/place-pixel", post(api::place_pixel))
        .route("/api/user-stats", get(api::user_stats))
        .route("/api/reconcile", post(api::reconcile))
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
