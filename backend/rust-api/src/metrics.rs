use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::{future::Future, time::Instant};

lazy_static! {
    // HTTP, labelled by route template
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Document store
    pub static ref DB_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "db_operations_total",
        "Total number of database operations",
        &["operation", "collection", "status"]
    )
    .unwrap();

    pub static ref DB_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "db_operation_duration_seconds",
        "Database operation duration in seconds",
        &["operation", "collection"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // Cache (Redis)
    pub static ref CACHE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_operations_total",
        "Total number of cache operations",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref ATTEMPT_CACHE_LOOKUPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "qotd_attempt_cache_lookups_total",
        "Per-day attempt lookups answered by the cache (hit) or the store (miss)",
        &["result"]
    )
    .unwrap();

    pub static ref CACHE_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "cache_operation_duration_seconds",
        "Cache operation duration in seconds",
        &["operation"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1]
    )
    .unwrap();

    // Study hub
    pub static ref QOTD_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "qotd_attempts_total",
        "Question of the day attempts recorded",
        &["correct"]
    )
    .unwrap();

    pub static ref GATING_DECISIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gating_decisions_total",
        "Content click decisions for the soft paywall",
        &["outcome"]
    )
    .unwrap();

    pub static ref USERNAME_CLAIMS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "username_claims_total",
        "Username change requests by result",
        &["status"]
    )
    .unwrap();

    pub static ref AUTH_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "auth_events_total",
        "Authentication events",
        &["event"]
    )
    .unwrap();
}

/// Text exposition of the default registry for `/metrics`.
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("Metrics are not UTF-8: {}", e)))
}

fn outcome<T>(result: &anyhow::Result<T>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "error"
    }
}

/// Times a document store call and counts it by collection and outcome.
pub async fn track_db_operation<F, T>(operation: &str, collection: &str, future: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    let start = Instant::now();
    let result = future.await;
    DB_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(start.elapsed().as_secs_f64());
    DB_OPERATIONS_TOTAL
        .with_label_values(&[operation, collection, outcome(&result)])
        .inc();
    result
}

/// Same as [`track_db_operation`] for Redis commands.
pub async fn track_cache_operation<F, T>(operation: &str, future: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    let start = Instant::now();
    let result = future.await;
    CACHE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(start.elapsed().as_secs_f64());
    CACHE_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome(&result)])
        .inc();
    result
}

pub fn record_cache_hit() {
    ATTEMPT_CACHE_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    ATTEMPT_CACHE_LOOKUPS_TOTAL.with_label_values(&["miss"]).inc();
}
