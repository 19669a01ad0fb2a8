use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::{extractors::AppJson, models::calculator::ScoreRequest, services::calculator};

/// POST /api/v1/calculator/ap-score
pub async fn predict(
    AppJson(req): AppJson<ScoreRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let prediction = calculator::predict_score(&req).map_err(|e| (e.status(), e.to_string()))?;
    Ok(Json(prediction))
}
