//! Integration tests for the cron trigger and the notification inbox.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use touchline::clock::FixedClock;
use touchline::config::LicensingConfig;
use touchline::license::LicenseType;
use touchline::server::handlers::AppState;
use touchline::server::routes::build_router;
use touchline::store::{MemoryStore, VideoStore};
use touchline::video::{NewLicense, NewVideo};
use tower::ServiceExt;

const SECRET: &str = "cron-test-secret";

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap()
}

async fn setup_test_app(secret: &str) -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        store.clone(),
        Arc::new(FixedClock(now())),
        LicensingConfig::default(),
        secret,
    );
    (state, store)
}

async fn seed(store: &MemoryStore, title: &str, expires_in_days: Option<i64>) {
    store
        .create(NewVideo {
            url: "https://youtu.be/abc".to_string(),
            title: title.to_string(),
            creator: "Coach".to_string(),
            created_date: now(),
            duration: "1:00".to_string(),
            attribution: "Coach".to_string(),
            thumbnail_url: None,
            tags: vec![],
            license: NewLicense {
                license_type: LicenseType::Licensed,
                start_date: now() - Duration::days(200),
                expiration_date: expires_in_days.map(|d| now() + Duration::days(d)),
                terms: vec![],
                restrictions: vec![],
                territory_restrictions: vec![],
                renewal_terms: None,
            },
        })
        .await
        .unwrap();
}

async fn request(
    app: axum::Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, body)
}

#[tokio::test]
async fn cron_rejects_missing_and_wrong_secret() {
    let (state, _) = setup_test_app(SECRET).await;

    let (status, body) = request(
        build_router(state.clone()),
        "GET",
        "/api/cron/check-licenses",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = request(
        build_router(state),
        "GET",
        "/api/cron/check-licenses",
        Some("wrong"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cron_rejects_everyone_without_configured_secret() {
    let (state, _) = setup_test_app("").await;

    let (status, _) = request(
        build_router(state),
        "GET",
        "/api/cron/check-licenses",
        Some(""),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cron_creates_notifications_for_expiring_licenses() {
    let (state, store) = setup_test_app(SECRET).await;
    seed(&store, "Expired drill", Some(-2)).await;
    seed(&store, "Soon drill", Some(10)).await;
    seed(&store, "Later drill", Some(45)).await;
    seed(&store, "Perpetual drill", None).await;

    let (status, body) = request(
        build_router(state.clone()),
        "GET",
        "/api/cron/check-licenses",
        Some(SECRET),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["notificationsCreated"], 1);
    assert_eq!(
        body["message"],
        "Created 1 notifications for expiring licenses"
    );

    let (_, inbox) = request(build_router(state), "GET", "/api/notifications", None).await;
    let inbox = inbox.as_array().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["type"], "LICENSE_EXPIRING");
    assert_eq!(inbox[0]["status"], "UNREAD");
    assert_eq!(inbox[0]["title"], "License Expiring: Soon drill");
    assert_eq!(
        inbox[0]["message"],
        "The license for video \"Soon drill\" will expire on March 11, 2024. Please review and take necessary action."
    );
}

#[tokio::test]
async fn mark_read_decrements_unread_count() {
    let (state, store) = setup_test_app(SECRET).await;
    seed(&store, "A", Some(3)).await;
    seed(&store, "B", Some(4)).await;
    request(
        build_router(state.clone()),
        "GET",
        "/api/cron/check-licenses",
        Some(SECRET),
    )
    .await;

    let (_, count) = request(
        build_router(state.clone()),
        "GET",
        "/api/notifications/unread-count",
        None,
    )
    .await;
    assert_eq!(count["count"], 2);

    let (_, inbox) = request(build_router(state.clone()), "GET", "/api/notifications", None).await;
    let id = inbox[0]["id"].as_str().unwrap().to_string();

    let (status, read) = request(
        build_router(state.clone()),
        "POST",
        &format!("/api/notifications/{id}/read"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["status"], "READ");

    let (_, count) = request(
        build_router(state.clone()),
        "GET",
        "/api/notifications/unread-count",
        None,
    )
    .await;
    assert_eq!(count["count"], 1);

    let (_, unread) = request(
        build_router(state),
        "GET",
        "/api/notifications?status=unread",
        None,
    )
    .await;
    assert_eq!(unread.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_notification_returns_not_found() {
    let (state, _) = setup_test_app(SECRET).await;

    let (status, _) = request(
        build_router(state.clone()),
        "POST",
        "/api/notifications/nope/read",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(
        build_router(state),
        "DELETE",
        "/api/notifications/nope",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_notification_removes_it() {
    let (state, store) = setup_test_app(SECRET).await;
    seed(&store, "A", Some(3)).await;
    request(
        build_router(state.clone()),
        "GET",
        "/api/cron/check-licenses",
        Some(SECRET),
    )
    .await;

    let (_, inbox) = request(build_router(state.clone()), "GET", "/api/notifications", None).await;
    let id = inbox[0]["id"].as_str().unwrap().to_string();

    let (status, _) = request(
        build_router(state.clone()),
        "DELETE",
        &format!("/api/notifications/{id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, inbox) = request(build_router(state), "GET", "/api/notifications", None).await;
    assert!(inbox.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_notification_status_is_rejected() {
    let (state, _) = setup_test_app(SECRET).await;
    let (status, _) = request(
        build_router(state),
        "GET",
        "/api/notifications?status=archived",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
