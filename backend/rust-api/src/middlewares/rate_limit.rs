use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, Extensions, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::services::AppState;

/// Fixed-window limit on one auth endpoint, counted per client IP.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRule {
    pub scope: &'static str,
    pub limit: u32,
    pub window_seconds: u64,
    /// Environment variable that overrides `limit`
    pub limit_env: &'static str,
}

pub const LOGIN_RULE: RateLimitRule = RateLimitRule {
    scope: "login",
    limit: 10,
    window_seconds: 300,
    limit_env: "RATE_LIMIT_LOGIN_ATTEMPTS",
};

pub const REGISTER_RULE: RateLimitRule = RateLimitRule {
    scope: "register",
    limit: 5,
    window_seconds: 3600,
    limit_env: "RATE_LIMIT_REGISTER_ATTEMPTS",
};

impl RateLimitRule {
    fn effective_limit(&self) -> u32 {
        std::env::var(self.limit_env)
            .ok()
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(self.limit)
    }

    fn key(&self, client: &str) -> String {
        format!("ratelimit:{}:{}", self.scope, client)
    }
}

fn first_forwarded_for(value: &str) -> Option<String> {
    value
        .split([';', ','])
        .map(str::trim)
        .find_map(|part| {
            let (name, val) = part.split_once('=')?;
            name.eq_ignore_ascii_case("for")
                .then(|| val.trim().trim_matches('"').to_string())
        })
}

/// Client address: X-Forwarded-For, Forwarded, X-Real-IP, then the socket peer.
pub(crate) fn extract_client_ip_from(headers: &HeaderMap, extensions: &Extensions) -> String {
    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(list) = header_str("x-forwarded-for") {
        if let Some(first) = list.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
            return first.to_string();
        }
    }
    if let Some(client) = header_str("forwarded").and_then(first_forwarded_for) {
        return client;
    }
    if let Some(real_ip) = header_str("x-real-ip") {
        return real_ip.trim().to_string();
    }
    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    "unknown".to_string()
}

fn too_many_requests(rule: &RateLimitRule) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        format!("Too many {} attempts, try again later", rule.scope),
    )
        .into_response();
    response.headers_mut().insert(
        header::RETRY_AFTER,
        HeaderValue::from(rule.window_seconds),
    );
    response
}

async fn enforce(state: &AppState, rule: RateLimitRule, request: Request, next: Next) -> Response {
    if std::env::var("RATE_LIMIT_DISABLED").is_ok_and(|v| v == "1") {
        return next.run(request).await;
    }

    let client_ip = extract_client_ip_from(request.headers(), request.extensions());
    match state
        .cache
        .hit_window(&rule.key(&client_ip), rule.effective_limit(), rule.window_seconds)
        .await
    {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            tracing::warn!("{} rate limit exceeded for IP: {}", rule.scope, client_ip);
            too_many_requests(&rule)
        }
        Err(e) => {
            tracing::error!("{} rate limit check failed: {:#}", rule.scope, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn login_rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state, LOGIN_RULE, request, next).await
}

pub async fn register_rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    enforce(&state, REGISTER_RULE, request, next).await
}
