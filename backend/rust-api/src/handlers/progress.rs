use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::into_response_error,
    extractors::{AppJson, AuthUser},
    models::progress::FinalQuizRequest,
    services::AppState,
};

/// GET /api/v1/progress
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let overview = state
        .progress_service()
        .overview(&user.user_id)
        .await
        .map_err(|e| into_response_error("Failed to load progress", e))?;
    Ok(Json(overview))
}

/// PUT /api/v1/progress/units/{unit_id}/subunits/{subunit_id}
pub async fn complete_subunit(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((unit_id, subunit_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let view = state
        .progress_service()
        .mark_subunit(&user.user_id, &unit_id, &subunit_id)
        .await
        .map_err(|e| into_response_error("Failed to mark subunit", e))?;
    Ok(Json(view))
}

/// POST /api/v1/progress/units/{unit_id}/final-quiz
pub async fn record_final_quiz(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(unit_id): Path<String>,
    AppJson(req): AppJson<FinalQuizRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if let Err(e) = req.validate() {
        return Err((StatusCode::BAD_REQUEST, format!("Validation error: {}", e)));
    }

    let view = state
        .progress_service()
        .record_final_quiz(&user.user_id, &unit_id, req.percent)
        .await
        .map_err(|e| into_response_error("Failed to record final quiz", e))?;
    Ok(Json(view))
}
