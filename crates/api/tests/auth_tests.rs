mod common;

use api::auth::tokens::issue_token;
use axum::http::StatusCode;
use chrono::Duration;
use common::test_app;
use infra::models::{TokenPurpose, UserRole};
use infra::Store;
use serde_json::json;

#[tokio::test]
async fn register_login_and_profile() {
    let app = test_app();

    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({ "name": "Asha", "email": " Asha@Example.com ", "password": "secret1", "role": "owner" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["email"], "asha@example.com");
    assert_eq!(body["user"]["role"], "owner");
    assert!(body["user"].get("password_hash").is_none());

    let (status, _) = app
        .post(
            "/auth/register",
            None,
            json!({ "name": "Asha", "email": "asha@example.com", "password": "secret1" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post("/auth/login", None, json!({ "email": "asha@example.com", "password": "wrong!!" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, login) = app
        .post("/auth/login", None, json!({ "email": "asha@example.com", "password": "secret1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["token"].as_str().unwrap().to_string();

    let (status, me) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Asha");
    assert_eq!(me["is_profile_complete"], false);

    let (status, updated) = app
        .request(
            axum::http::Method::PUT,
            "/auth/me",
            Some(&token),
            Some(json!({ "phone": "9999999999", "name": "  " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Asha");
    assert_eq!(updated["phone"], "9999999999");
    assert_eq!(updated["is_profile_complete"], true);

    let (status, _) = app.get("/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_rejects_bad_input() {
    let app = test_app();

    for body in [
        json!({ "name": "", "email": "a@b.co", "password": "secret1" }),
        json!({ "name": "A", "email": "not-an-email", "password": "secret1" }),
        json!({ "name": "A", "email": "a@b.co", "password": "short" }),
        json!({ "name": "A", "email": "a@b.co", "password": "secret1", "role": "admin" }),
    ] {
        let (status, _) = app.post("/auth/register", None, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn email_verification_redirects() {
    let app = test_app();
    let (user, _) = app.create_user(UserRole::Player).await;
    let raw = issue_token(
        &app.state.store,
        user.id,
        TokenPurpose::EmailVerification,
        Duration::hours(1),
    )
    .await
    .unwrap();

    let (status, _) = app.get(&format!("/auth/verify/{raw}"), None).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let verified = app.state.store.find_user_by_id(user.id).await.unwrap().unwrap();
    assert!(verified.is_verified);

    let response = app.get(&format!("/auth/verify/{raw}"), None).await;
    assert_eq!(response.0, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn password_reset_flow() {
    let app = test_app();
    let (user, _) = app.create_user(UserRole::Player).await;

    let (status, unknown) = app
        .post("/auth/forgot-password", None, json!({ "email": "nobody@example.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, known) = app
        .post("/auth/forgot-password", None, json!({ "email": user.email }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unknown, known);

    let raw = issue_token(
        &app.state.store,
        user.id,
        TokenPurpose::PasswordReset,
        Duration::minutes(15),
    )
    .await
    .unwrap();

    let (status, _) = app
        .post(&format!("/auth/reset-password/{raw}"), None, json!({ "password": "abc" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(&format!("/auth/reset-password/{raw}"), None, json!({ "password": "new-secret" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(&format!("/auth/reset-password/{raw}"), None, json!({ "password": "another-one" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/auth/login", None, json!({ "email": user.email, "password": "new-secret" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_is_rate_limited_per_client() {
    let app = test_app();
    let body = json!({ "email": "nobody@example.com", "password": "secret1" });

    for _ in 0..10 {
        let (status, _) = app.post("/auth/login", None, body.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = app.post("/auth/login", None, body).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}
