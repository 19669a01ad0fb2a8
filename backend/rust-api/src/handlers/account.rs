use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    error::into_response_error,
    extractors::{AppJson, AuthUser},
    models::user::{UpdatePreferencesRequest, UsernameAvailabilityQuery, UsernameRequest},
    services::AppState,
};

/// GET /api/v1/account
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .account_service()
        .profile(&user.user_id)
        .await
        .map_err(|e| into_response_error("Failed to load account", e))?;
    Ok(Json(profile))
}

/// GET /api/v1/account/username/availability?username=
pub async fn username_availability(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<UsernameAvailabilityQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let availability = state
        .account_service()
        .availability(&user.user_id, &query.username)
        .await
        .map_err(|e| into_response_error("Failed to check username", e))?;
    Ok(Json(availability))
}

/// PUT /api/v1/account/username
pub async fn set_username(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppJson(req): AppJson<UsernameRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .account_service()
        .claim_username(&user.user_id, &req.username)
        .await
        .map_err(|e| into_response_error("Failed to set username", e))?;
    Ok(Json(profile))
}

/// PUT /api/v1/account/preferences
pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppJson(req): AppJson<UpdatePreferencesRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .account_service()
        .set_theme(&user.user_id, req.theme)
        .await
        .map_err(|e| into_response_error("Failed to update preferences", e))?;
    Ok(Json(profile))
}

/// GET /api/v1/account/summary - Username, unit progress and daily-question stats
pub async fn summary(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let summary = state
        .account_service()
        .summary(
            &user.user_id,
            &state.progress_service(),
            &state.qotd_service(),
        )
        .await
        .map_err(|e| into_response_error("Failed to load account summary", e))?;
    Ok(Json(summary))
}
