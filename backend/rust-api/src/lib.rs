use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod cache;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; \
             script-src 'self' https://accounts.google.com; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data: https:; \
             connect-src 'self' https://oauth2.googleapis.com",
        ),
    );
    response
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    let api = Router::new()
        .nest("/auth", auth_routes(app_state.clone()))
        .nest("/account", account_routes(app_state.clone()))
        .nest("/qotd", qotd_routes(app_state.clone()))
        .route(
            "/leaderboard",
            get(handlers::leaderboard::get_leaderboard).route_layer(
                middleware::from_fn_with_state(
                    app_state.clone(),
                    middlewares::auth::auth_middleware,
                ),
            ),
        )
        .nest("/progress", progress_routes(app_state.clone()))
        .nest("/gating", gating_routes(app_state.clone()))
        .route("/calculator/ap-score", post(handlers::calculator::predict))
        .route("/site/units", get(handlers::site::units))
        .route("/site/countdown", get(handlers::site::countdown));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest("/api/v1", api)
        .with_state(app_state)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(middleware::from_fn(csp_middleware))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(middlewares::trace::make_request_span))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
}

fn auth_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let register_route = Router::new()
        .route("/register", post(handlers::auth::register))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::rate_limit::register_rate_limit_middleware,
        ));

    let login_route = Router::new()
        .route("/login", post(handlers::auth::login))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::rate_limit::login_rate_limit_middleware,
        ));

    let public_routes = Router::new()
        .route("/verify-email", post(handlers::auth::verify_email))
        .route(
            "/resend-verification",
            post(handlers::auth::resend_verification),
        )
        .route("/google", post(handlers::auth::google_sign_in));

    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::get_current_user))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ));

    register_route
        .merge(login_route)
        .merge(public_routes)
        .merge(protected_routes)
}

fn account_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::account::get_account))
        .route("/username", put(handlers::account::set_username))
        .route(
            "/username/availability",
            get(handlers::account::username_availability),
        )
        .route("/preferences", put(handlers::account::update_preferences))
        .route("/summary", get(handlers::account::summary))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ))
}

fn qotd_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public_routes = Router::new()
        .route("/today", get(handlers::qotd::today))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::auth::optional_auth_middleware,
        ));

    let protected_routes = Router::new()
        .route("/attempts", post(handlers::qotd::submit_attempt))
        .route("/stats", get(handlers::qotd::stats))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ));

    public_routes.merge(protected_routes)
}

fn progress_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::progress::get_progress))
        .route(
            "/units/{unit_id}/subunits/{subunit_id}",
            put(handlers::progress::complete_subunit),
        )
        .route(
            "/units/{unit_id}/final-quiz",
            post(handlers::progress::record_final_quiz),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ))
}

fn gating_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(handlers::gating::status))
        .route("/clicks", post(handlers::gating::register_click))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::optional_auth_middleware,
        ))
}
