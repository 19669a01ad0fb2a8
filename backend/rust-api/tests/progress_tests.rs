use axum::http::StatusCode;
use serde_json::json;

mod common;

use common::create_test_app;

fn unit<'a>(overview: &'a serde_json::Value, unit_id: &str) -> &'a serde_json::Value {
    overview["units"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["unit_id"] == unit_id)
        .unwrap()
}

#[tokio::test]
async fn test_progress_requires_sign_in() {
    let app = create_test_app();
    assert_eq!(
        app.get("/api/v1/progress", None).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.put("/api/v1/progress/units/unit-1/subunits/1-1", None, None)
            .await
            .status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_new_user_starts_at_zero() {
    let app = create_test_app();
    let token = app.signed_in_user("fresh@example.com").await;

    let overview = app.get("/api/v1/progress", Some(&token)).await;
    assert_eq!(overview.status, StatusCode::OK);
    assert_eq!(overview.body["units"].as_array().unwrap().len(), 9);
    assert!(overview.body["best_final_quiz_score"].is_null());
    assert_eq!(unit(&overview.body, "unit-3")["total_subunits"], 13);
    assert_eq!(unit(&overview.body, "unit-3")["percent"], 0);
}

#[tokio::test]
async fn test_marking_subunits_is_idempotent() {
    let app = create_test_app();
    let token = app.signed_in_user("marks@example.com").await;

    let first = app
        .put("/api/v1/progress/units/unit-1/subunits/1-1", Some(&token), None)
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["completed_subunits"], 1);
    assert_eq!(first.body["percent"], 11);

    let again = app
        .put("/api/v1/progress/units/unit-1/subunits/1-1", Some(&token), None)
        .await;
    assert_eq!(again.body["completed_subunits"], 1);

    app.put("/api/v1/progress/units/unit-1/subunits/1-2", Some(&token), None)
        .await;
    let overview = app.get("/api/v1/progress", Some(&token)).await;
    assert_eq!(unit(&overview.body, "unit-1")["completed_subunits"], 2);
    assert_eq!(unit(&overview.body, "unit-2")["completed_subunits"], 0);
}

#[tokio::test]
async fn test_final_quiz_keeps_completion_and_best_score() {
    let app = create_test_app();
    let token = app.signed_in_user("quiz@example.com").await;
    let uri = "/api/v1/progress/units/unit-5/final-quiz";

    let failed = app.post(uri, Some(&token), json!({ "percent": 55.0 })).await;
    assert_eq!(failed.status, StatusCode::OK);
    assert_eq!(failed.body["final_quiz_completed"], false);
    assert_eq!(failed.body["final_quiz_highest_score"], 55.0);

    let passed = app.post(uri, Some(&token), json!({ "percent": 90.0 })).await;
    assert_eq!(passed.body["final_quiz_completed"], true);
    // unit-5: 11 subunits + quiz, 1/12 rounds to 8
    assert_eq!(passed.body["percent"], 8);

    let retake = app.post(uri, Some(&token), json!({ "percent": 20.0 })).await;
    assert_eq!(retake.body["final_quiz_completed"], true);
    assert_eq!(retake.body["final_quiz_highest_score"], 90.0);

    let overview = app.get("/api/v1/progress", Some(&token)).await;
    assert_eq!(overview.body["best_final_quiz_score"], 90.0);
}

#[tokio::test]
async fn test_invalid_progress_requests() {
    let app = create_test_app();
    let token = app.signed_in_user("bad@example.com").await;

    let unknown = app
        .put("/api/v1/progress/units/unit-42/subunits/1-1", Some(&token), None)
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let bad_subunit = app
        .put(
            "/api/v1/progress/units/unit-1/subunits/not%20valid",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(bad_subunit.status, StatusCode::BAD_REQUEST);

    let too_high = app
        .post(
            "/api/v1/progress/units/unit-1/final-quiz",
            Some(&token),
            json!({ "percent": 101.0 }),
        )
        .await;
    assert_eq!(too_high.status, StatusCode::BAD_REQUEST);

    let unknown_quiz = app
        .post(
            "/api/v1/progress/units/unit-0/final-quiz",
            Some(&token),
            json!({ "percent": 50.0 }),
        )
        .await;
    assert_eq!(unknown_quiz.status, StatusCode::NOT_FOUND);
}
