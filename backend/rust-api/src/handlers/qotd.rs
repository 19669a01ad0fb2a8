use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::{
    error::into_response_error,
    extractors::{AppJson, AuthUser, MaybeAuthUser},
    models::qotd::SubmitAttemptRequest,
    services::AppState,
};

/// GET /api/v1/qotd/today - Locked for anonymous visitors
pub async fn today(
    State(state): State<Arc<AppState>>,
    user: MaybeAuthUser,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let view = state
        .qotd_service()
        .today_for(user.user_id())
        .await
        .map_err(|e| into_response_error("Failed to load question of the day", e))?;
    Ok(Json(view))
}

/// POST /api/v1/qotd/attempts - One answer per user per day
pub async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppJson(req): AppJson<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let outcome = state
        .qotd_service()
        .submit(&user.user_id, req.answer_index)
        .await
        .map_err(|e| into_response_error("Failed to submit attempt", e))?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /api/v1/qotd/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let stats = state
        .qotd_service()
        .stats(&user.user_id)
        .await
        .map_err(|e| into_response_error("Failed to load stats", e))?;
    Ok(Json(stats))
}
