use axum::http::StatusCode;

/// Domain failures that services raise inside `anyhow::Error`.
///
/// Handlers downcast to pick a status code; anything else is a 500.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("upstream service failed: {0}")]
    Upstream(String),
}

impl HubError {
    pub fn status(&self) -> StatusCode {
        match self {
            HubError::NotFound(_) => StatusCode::NOT_FOUND,
            HubError::Conflict(_) => StatusCode::CONFLICT,
            HubError::Validation(_) => StatusCode::BAD_REQUEST,
            HubError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            HubError::Forbidden(_) => StatusCode::FORBIDDEN,
            HubError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Maps a service error onto the `(StatusCode, String)` pair handlers return.
///
/// Internal errors are logged with full context and answered with a generic message.
pub fn into_response_error(context: &str, err: anyhow::Error) -> (StatusCode, String) {
    match err.downcast_ref::<HubError>() {
        Some(hub) => {
            tracing::debug!("{}: {}", context, hub);
            (hub.status(), hub.to_string())
        }
        None => {
            tracing::error!("{}: {:#}", context, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}
