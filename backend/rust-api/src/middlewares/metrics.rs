use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Label for requests that matched no route (404 probes, typos).
const UNMATCHED_ROUTE: &str = "unmatched";

/// Route template used as the `path` label. Subunit ids and other path
/// parameters stay out of the label set.
fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

/// Records request count and latency per route
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let route = route_label(&req);

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &route, &status])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &route])
        .observe(start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::put, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .nest(
                "/api/v1/progress",
                Router::new().route("/units/{unit_id}/subunits/{subunit_id}", put(|| async { "ok" })),
            )
            .layer(middleware::from_fn(metrics_middleware))
    }

    async fn send(uri: &str) {
        app()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn path_parameters_collapse_into_template() {
        let template = "/api/v1/progress/units/{unit_id}/subunits/{subunit_id}";
        let before = HTTP_REQUESTS_TOTAL
            .with_label_values(&["PUT", template, "200"])
            .get();

        send("/api/v1/progress/units/unit-1/subunits/1-1").await;
        send("/api/v1/progress/units/unit-2/subunits/2-7").await;

        let after = HTTP_REQUESTS_TOTAL
            .with_label_values(&["PUT", template, "200"])
            .get();
        assert!(after >= before + 2);
    }

    #[tokio::test]
    async fn unknown_paths_share_one_label() {
        send("/no/such/route").await;
        assert!(
            HTTP_REQUESTS_TOTAL
                .with_label_values(&["PUT", UNMATCHED_ROUTE, "404"])
                .get()
                >= 1
        );
    }
}
