//! REST adapter over the placement pipeline and read paths.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::routes::identity;
use crate::services::placement::{self, PlacementError, PlacementRequest};
use crate::services::query;
use crate::state::AppState;

/// `GET /api/canvas` — full snapshot plus total, cache-first.
pub async fn get_canvas(State(state): State<AppState>) -> impl IntoResponse {
    let canvas = query::canvas_wire(&state).await;
    let total_pixels = query::total_pixels(&state).await;
    Json(json!({ "canvas": canvas, "total_pixels": total_pixels }))
}

/// `GET /api/cooldown` — remaining window for the caller, without
/// consuming it.
pub async fn get_cooldown(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let (user_id, jar) = identity::resolve(jar);
    let remaining = state.cooldowns.remaining_secs(user_id);
    (jar, Json(json!({ "cooldown_remaining": remaining })))
}

/// `POST /api/place-pixel` — run one placement through the pipeline.
pub async fn place_pixel(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<PlacementRequest>,
) -> impl IntoResponse {
    let (user_id, jar) = identity::resolve(jar);

    match placement::place_pixel(&state, user_id, &request).await {
        Ok(placement) => (
            StatusCode::OK,
            jar,
            Json(json!({
                "accepted": true,
                "cooldown_remaining": placement.cooldown_secs,
            })),
        ),
        Err(err) => {
            let (status, body) = rejection(&err);
            (status, jar, Json(body))
        }
    }
}

fn rejection(err: &PlacementError) -> (StatusCode, serde_json::Value) {
    match err {
        PlacementError::Invalid(_) => (
            StatusCode::BAD_REQUEST,
            json!({ "accepted": false, "reason": err.reason() }),
        ),
        PlacementError::CooldownActive { remaining_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            json!({
                "accepted": false,
                "reason": err.reason(),
                "cooldown_remaining": remaining_secs,
            }),
        ),
    }
}

/// `GET /api/user-stats` — caller's pixel count plus the global total.
pub async fn user_stats(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let (user_id, jar) = identity::resolve(jar);
    let stats = query::user_stats(&state, user_id).await;
    (jar, Json(stats))
}

/// `POST /api/reconcile` — recompute counters from a fresh snapshot.
pub async fn reconcile(State(state): State<AppState>) -> impl IntoResponse {
    let report = query::reconcile_counters(&state).await;
    Json(report)
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
