//! API integration tests.
//!
//! These run the full router over a mock database connection, so they cover
//! routing, the auth middleware and the error envelope rather than query
//! semantics.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use geonote_api::{AppState, auth_middleware, router as api_router};
use geonote_common::LocalStorage;
use geonote_db::entities::user;
use sea_orm::{DatabaseBackend, MockDatabase};
use tower::ServiceExt;

fn anonymous_user() -> user::Model {
    user::Model {
        id: "anonymous".to_string(),
        display_name: "Anonymous".to_string(),
        display_name_lower: "anonymous".to_string(),
        email: "anonymous@localhost".to_string(),
        email_lower: "anonymous@localhost".to_string(),
        password_hash: None,
        token: None,
        is_anonymous: true,
        is_superuser: false,
        created_at: Utc::now().into(),
    }
}

/// Build a router over a prepared mock database.
fn router_with(mock: MockDatabase) -> Router {
    let db = Arc::new(mock.into_connection());
    let storage = Arc::new(LocalStorage::new(
        PathBuf::from("/tmp/geonote-test"),
        "http://localhost/media".to_string(),
    ));
    let state = AppState::build(db, storage);
    api_router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    // Token lookup finds nothing.
    let mock = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()]);
    let app = router_with(mock);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/projects")
                .header("Authorization", "Bearer bogus")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_project_listing_is_ok() {
    // Sentinel lookup, then an empty project listing.
    let mock = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![anonymous_user()]])
        .append_query_results([Vec::<geonote_db::entities::project::Model>::new()]);
    let app = router_with(mock);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/projects")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_with_invalid_email_is_rejected() {
    let mock = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![anonymous_user()]]);
    let app = router_with(mock);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/users")
                .method("POST")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"display_name":"carla","email":"not-an-email","password":"hunter22"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_with_unknown_account_is_rejected() {
    // Sentinel lookup for the middleware, then a miss on the display name.
    let mock = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![anonymous_user()]])
        .append_query_results([Vec::<user::Model>::new()]);
    let app = router_with(mock);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/users/login")
                .method("POST")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"display_name":"nobody","password":"wrong"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_requires_a_signed_in_account() {
    let mock = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![anonymous_user()]]);
    let app = router_with(mock);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/users/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let mock = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![anonymous_user()]]);
    let app = router_with(mock);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
