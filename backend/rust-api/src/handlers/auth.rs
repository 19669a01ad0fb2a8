use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use super::gating::clear_visitor_clicks;
use crate::{
    error::into_response_error,
    extractors::{AppJson, AuthUser},
    models::user::{
        GoogleSignInRequest, LoginRequest, RegisterRequest, ResendVerificationRequest,
        VerifyEmailRequest,
    },
    services::AppState,
};

fn validation_error(e: validator::ValidationErrors) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, format!("Validation error: {}", e))
}

/// POST /api/v1/auth/register - Create a password account pending email verification
pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate().map_err(validation_error)?;

    tracing::info!("Registering new user: {}", req.email);
    let response = state
        .auth_service()
        .register(req)
        .await
        .map_err(|e| into_response_error("Failed to register user", e))?;

    clear_visitor_clicks(&state, &jar).await;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/verify-email - Confirm the address from the emailed link
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<VerifyEmailRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state
        .auth_service()
        .verify_email(&req.token)
        .await
        .map_err(|e| into_response_error("Failed to verify email", e))?;
    Ok(Json(user))
}

/// POST /api/v1/auth/resend-verification - Always 202, whether or not the email exists
pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ResendVerificationRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate().map_err(validation_error)?;

    state
        .auth_service()
        .resend_verification(&req.email)
        .await
        .map_err(|e| into_response_error("Failed to resend verification", e))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "If the account exists and is unverified, a new link has been sent"
        })),
    ))
}

/// POST /api/v1/auth/login - Login with email and password
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate().map_err(validation_error)?;

    let response = state
        .auth_service()
        .login(req)
        .await
        .map_err(|e| into_response_error("Login failed", e))?;

    clear_visitor_clicks(&state, &jar).await;
    Ok(Json(response))
}

/// POST /api/v1/auth/google - Sign in with a Google ID token
pub async fn google_sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    AppJson(req): AppJson<GoogleSignInRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate().map_err(validation_error)?;

    let response = state
        .auth_service()
        .google_sign_in(&req.id_token)
        .await
        .map_err(|e| into_response_error("Google sign-in failed", e))?;

    clear_visitor_clicks(&state, &jar).await;
    Ok(Json(response))
}

/// GET /api/v1/auth/me - Get current user profile
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .account_service()
        .profile(&user.user_id)
        .await
        .map_err(|e| into_response_error("Failed to load current user", e))?;
    Ok(Json(profile))
}
