use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::services::{site_service, AppState};

/// GET /api/v1/site/units
pub async fn units() -> impl IntoResponse {
    Json(site_service::unit_navigation())
}

/// GET /api/v1/site/countdown
pub async fn countdown(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(site_service::exam_countdown(
        state.today(),
        state.config.site.exam_date,
    ))
}
