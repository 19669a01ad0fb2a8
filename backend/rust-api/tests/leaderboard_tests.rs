use axum::http::StatusCode;
use serde_json::json;

mod common;

use common::create_test_app;

async fn answer(app: &common::TestApp, token: &str, index: u32) {
    let response = app
        .post(
            "/api/v1/qotd/attempts",
            Some(token),
            json!({ "answer_index": index }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_leaderboard_requires_sign_in() {
    let app = create_test_app();
    let response = app.get("/api/v1/leaderboard", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_leaderboard_ranks_by_metric() {
    let app = create_test_app();
    let ada = app.named_user("ada@example.com", "ada").await;
    let ben = app.named_user("ben@example.com", "ben").await;
    let cy = app.signed_in_user("cy@example.com").await;

    // Day 1: correct answer is 0
    answer(&app, &ada, 0).await;
    answer(&app, &ben, 0).await;
    answer(&app, &cy, 1).await;
    // Day 2: correct answer is 2
    app.advance_days(1);
    answer(&app, &ada, 2).await;
    answer(&app, &ben, 0).await;

    let total = app.get("/api/v1/leaderboard", Some(&ada)).await;
    assert_eq!(total.status, StatusCode::OK);
    assert_eq!(total.body["metric"], "total");
    assert_eq!(total.body["header"], "Total Correct");
    let entries = total.body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["username"], "ada");
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[0]["display_value"], "2");
    assert_eq!(entries[1]["username"], "ben");

    // Users without a username are listed by id
    assert_eq!(entries[2]["username"], entries[2]["user_id"]);

    let percent = app
        .get("/api/v1/leaderboard?metric=percent", Some(&ben))
        .await;
    let entries = percent.body["entries"].as_array().unwrap();
    assert_eq!(entries[0]["username"], "ada");
    assert_eq!(entries[0]["display_value"], "100.0%");
    assert_eq!(entries[1]["display_value"], "50.0%");

    let streak = app
        .get("/api/v1/leaderboard?metric=streak", Some(&ben))
        .await;
    let entries = streak.body["entries"].as_array().unwrap();
    assert_eq!(entries[0]["username"], "ada");
    assert_eq!(entries[0]["best_streak"], 2);
    assert_eq!(entries[1]["best_streak"], 1);
}

#[tokio::test]
async fn test_leaderboard_truncates_to_configured_size() {
    let mut config = common::test_config();
    config.site.leaderboard_size = 2;
    let app = common::create_test_app_with(config);

    let mut tokens = Vec::new();
    for n in 0..3 {
        let token = app
            .named_user(&format!("p{}@example.com", n), &format!("player_{}", n))
            .await;
        answer(&app, &token, 0).await;
        tokens.push(token);
    }

    let board = app.get("/api/v1/leaderboard", Some(&tokens[0])).await;
    let entries = board.body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    // Ties break alphabetically
    assert_eq!(entries[0]["username"], "player_0");
    assert_eq!(entries[1]["username"], "player_1");
}

#[tokio::test]
async fn test_unknown_metric_is_rejected() {
    let app = create_test_app();
    let token = app.signed_in_user("metric@example.com").await;
    let response = app
        .get("/api/v1/leaderboard?metric=fastest", Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
