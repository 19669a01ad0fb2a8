use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    error::into_response_error, extractors::AuthUser, models::leaderboard::LeaderboardQuery,
    services::AppState,
};

/// GET /api/v1/leaderboard?metric=total|streak|percent
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let board = state
        .leaderboard_service()
        .leaderboard(query.metric, state.today())
        .await
        .map_err(|e| into_response_error("Failed to build leaderboard", e))?;
    Ok(Json(board))
}
