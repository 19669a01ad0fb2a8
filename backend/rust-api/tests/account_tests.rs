use axum::http::StatusCode;
use serde_json::json;

mod common;

use common::create_test_app;

#[tokio::test]
async fn test_username_claim_rules() {
    let app = create_test_app();
    let alice = app.signed_in_user("alice@example.com").await;
    let bob = app.signed_in_user("bob@example.com").await;

    let invalid = app
        .put(
            "/api/v1/account/username",
            Some(&alice),
            Some(json!({ "username": "no spaces!" })),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let claimed = app
        .put(
            "/api/v1/account/username",
            Some(&alice),
            Some(json!({ "username": "  avogadro_fan " })),
        )
        .await;
    assert_eq!(claimed.status, StatusCode::OK);
    assert_eq!(claimed.body["username"], "avogadro_fan");
    assert_eq!(claimed.body["needs_username"], false);

    let taken = app
        .put(
            "/api/v1/account/username",
            Some(&bob),
            Some(json!({ "username": "avogadro_fan" })),
        )
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    // Re-saving your own name succeeds
    let again = app
        .put(
            "/api/v1/account/username",
            Some(&alice),
            Some(json!({ "username": "avogadro_fan" })),
        )
        .await;
    assert_eq!(again.status, StatusCode::OK);
}

#[tokio::test]
async fn test_username_availability() {
    let app = create_test_app();
    let alice = app.named_user("alice@example.com", "hess_law").await;
    let bob = app.signed_in_user("bob@example.com").await;

    let theirs = app
        .get(
            "/api/v1/account/username/availability?username=hess_law",
            Some(&bob),
        )
        .await;
    assert_eq!(theirs.status, StatusCode::OK);
    assert_eq!(theirs.body["valid"], true);
    assert_eq!(theirs.body["available"], false);

    let mine = app
        .get(
            "/api/v1/account/username/availability?username=hess_law",
            Some(&alice),
        )
        .await;
    assert_eq!(mine.body["available"], true);

    let invalid = app
        .get("/api/v1/account/username/availability?username=x", Some(&bob))
        .await;
    assert_eq!(invalid.body["valid"], false);
    assert_eq!(invalid.body["available"], false);
}

#[tokio::test]
async fn test_account_requires_auth() {
    let app = create_test_app();
    for uri in [
        "/api/v1/account",
        "/api/v1/account/summary",
        "/api/v1/account/username/availability?username=abc",
    ] {
        assert_eq!(app.get(uri, None).await.status, StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn test_theme_preference_round_trip() {
    let app = create_test_app();
    let token = app.signed_in_user("dark@example.com").await;

    let profile = app.get("/api/v1/account", Some(&token)).await;
    assert_eq!(profile.body["preferences"]["theme"], "light");

    let updated = app
        .put(
            "/api/v1/account/preferences",
            Some(&token),
            Some(json!({ "theme": "dark" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["preferences"]["theme"], "dark");

    let bogus = app
        .put(
            "/api/v1/account/preferences",
            Some(&token),
            Some(json!({ "theme": "neon" })),
        )
        .await;
    assert_eq!(bogus.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_account_summary_combines_progress_and_stats() {
    let app = create_test_app();
    let token = app.named_user("summary@example.com", "le_chatelier").await;

    app.put(
        "/api/v1/progress/units/unit-1/subunits/1-1",
        Some(&token),
        None,
    )
    .await;
    // Question 0 of the test bank is today's; answer 0 is right
    app.post(
        "/api/v1/qotd/attempts",
        Some(&token),
        json!({ "answer_index": 0 }),
    )
    .await;

    let summary = app.get("/api/v1/account/summary", Some(&token)).await;
    assert_eq!(summary.status, StatusCode::OK);
    assert_eq!(summary.body["username"], "le_chatelier");
    assert_eq!(summary.body["progress"]["units"][0]["completed_subunits"], 1);
    assert_eq!(summary.body["qotd"]["attempted"], 1);
    assert_eq!(summary.body["qotd"]["current_streak"], 1);
}
