use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::into_response_error, extractors::MaybeAuthUser, services::AppState,
};

pub const VISITOR_COOKIE: &str = "visitor_id";

/// Reads the visitor id, issuing a fresh cookie when the browser has none.
fn visitor(jar: CookieJar) -> (CookieJar, String) {
    if let Some(existing) = jar.get(VISITOR_COOKIE) {
        let id = existing.value().to_string();
        return (jar, id);
    }

    let id = Uuid::new_v4().to_string();
    let cookie = Cookie::build((VISITOR_COOKIE, id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(365))
        .build();
    (jar.add(cookie), id)
}

/// Drops the anonymous click counter once the visitor has an account.
pub(crate) async fn clear_visitor_clicks(state: &AppState, jar: &CookieJar) {
    if let Some(cookie) = jar.get(VISITOR_COOKIE) {
        if let Err(e) = state.gating_service().reset(cookie.value()).await {
            tracing::warn!("Failed to reset gating counter: {:#}", e);
        }
    }
}

/// GET /api/v1/gating/status
pub async fn status(
    State(state): State<Arc<AppState>>,
    user: MaybeAuthUser,
    jar: CookieJar,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (jar, visitor_id) = visitor(jar);
    let status = state
        .gating_service()
        .status(&visitor_id, user.0.is_some())
        .await
        .map_err(|e| into_response_error("Failed to read gating status", e))?;
    Ok((jar, Json(status)))
}

/// POST /api/v1/gating/clicks - Count a content click and decide whether it proceeds
pub async fn register_click(
    State(state): State<Arc<AppState>>,
    user: MaybeAuthUser,
    jar: CookieJar,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (jar, visitor_id) = visitor(jar);
    let outcome = state
        .gating_service()
        .register_click(&visitor_id, user.0.is_some())
        .await
        .map_err(|e| into_response_error("Failed to record click", e))?;
    Ok((jar, Json(outcome)))
}
