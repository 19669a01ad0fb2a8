use axum::http::{Method, StatusCode};
use serde_json::json;

mod common;

use common::{create_test_app, PASSWORD};

#[tokio::test]
async fn test_register_requires_email_verification_before_login() {
    let app = create_test_app();

    let registered = app.register("lewis@example.com").await;
    assert_eq!(registered.status, StatusCode::CREATED);
    assert_eq!(registered.body["verification_required"], true);
    assert_eq!(registered.body["user"]["email_verified"], false);
    assert_eq!(app.mailer.count(), 1);

    let blocked = app.login("lewis@example.com", PASSWORD).await;
    assert_eq!(blocked.status, StatusCode::FORBIDDEN);

    let token = app.mailer.token_for("lewis@example.com").unwrap();
    let verified = app
        .post("/api/v1/auth/verify-email", None, json!({ "token": token }))
        .await;
    assert_eq!(verified.status, StatusCode::OK);
    assert_eq!(verified.body["email_verified"], true);

    let login = app.login("lewis@example.com", PASSWORD).await;
    assert_eq!(login.status, StatusCode::OK);
    assert!(login.body["access_token"].as_str().is_some());
    assert_eq!(login.body["user"]["needs_username"], true);
}

#[tokio::test]
async fn test_verification_token_is_single_use() {
    let app = create_test_app();
    app.register("once@example.com").await;
    let token = app.mailer.token_for("once@example.com").unwrap();

    let first = app
        .post("/api/v1/auth/verify-email", None, json!({ "token": token }))
        .await;
    assert_eq!(first.status, StatusCode::OK);

    let second = app
        .post("/api/v1/auth/verify-email", None, json!({ "token": token }))
        .await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = create_test_app();
    assert_eq!(
        app.register("dup@example.com").await.status,
        StatusCode::CREATED
    );
    assert_eq!(
        app.register("DUP@example.com").await.status,
        StatusCode::CONFLICT
    );
}

#[tokio::test]
async fn test_register_validates_input() {
    let app = create_test_app();
    let short = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({ "email": "short@example.com", "password": "abc" }),
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);

    let malformed = app
        .post("/api/v1/auth/register", None, json!({ "email": 42 }))
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert_eq!(malformed.body["status"], 400);
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let app = create_test_app();
    app.signed_in_user("wrong@example.com").await;

    let response = app.login("wrong@example.com", "not-the-password").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let unknown = app.login("nobody@example.com", PASSWORD).await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_resend_verification_issues_new_link() {
    let app = create_test_app();
    app.register("resend@example.com").await;
    let first = app.mailer.token_for("resend@example.com").unwrap();

    let response = app
        .post(
            "/api/v1/auth/resend-verification",
            None,
            json!({ "email": "resend@example.com" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(app.mailer.count(), 2);

    let second = app.mailer.token_for("resend@example.com").unwrap();
    assert_ne!(first, second);

    // The old link no longer works
    let stale = app
        .post("/api/v1/auth/verify-email", None, json!({ "token": first }))
        .await;
    assert_eq!(stale.status, StatusCode::BAD_REQUEST);

    // Unknown addresses get the same answer and no mail
    let unknown = app
        .post(
            "/api/v1/auth/resend-verification",
            None,
            json!({ "email": "ghost@example.com" }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::ACCEPTED);
    assert_eq!(app.mailer.count(), 2);
}

#[tokio::test]
async fn test_google_sign_in_creates_account_once() {
    let app = create_test_app();

    let first = app
        .post(
            "/api/v1/auth/google",
            None,
            json!({ "id_token": "google:sub-1:curie@example.com" }),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["user"]["provider"], "google");
    assert_eq!(first.body["user"]["needs_username"], true);
    let user_id = first.body["user"]["id"].clone();

    let second = app
        .post(
            "/api/v1/auth/google",
            None,
            json!({ "id_token": "google:sub-1:curie@example.com" }),
        )
        .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["user"]["id"], user_id);
}

#[tokio::test]
async fn test_google_sign_in_rejects_bad_token() {
    let app = create_test_app();
    let response = app
        .post("/api/v1/auth/google", None, json!({ "id_token": "forged" }))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_requires_valid_token() {
    let app = create_test_app();

    assert_eq!(
        app.get("/api/v1/auth/me", None).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.get("/api/v1/auth/me", Some("garbage")).await.status,
        StatusCode::UNAUTHORIZED
    );

    let token = app.signed_in_user("me@example.com").await;
    let me = app.get("/api/v1/auth/me", Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["email"], "me@example.com");
    assert!(me.body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_rate_limit_per_ip() {
    let app = create_test_app();

    let mut statuses = Vec::new();
    for n in 0..6 {
        let response = app
            .request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({ "email": format!("burst{}@example.com", n), "password": PASSWORD })),
                &[("x-forwarded-for", "203.0.113.9")],
            )
            .await;
        statuses.push(response.status);
    }

    assert!(statuses[..5].iter().all(|s| *s == StatusCode::CREATED));
    assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
}
