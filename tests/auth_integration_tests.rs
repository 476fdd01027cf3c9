use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{Request, StatusCode, header},
};
use catalog_api::{
    AppError, AppState, MemoryRepository, create_router,
    auth::AuthUser,
    config::AppConfig,
    error::ErrorBody,
    models::{NewUser, UserChanges},
    repository::Repository,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::test;
use tower::ServiceExt;

// --- TEST UTILITIES ---

fn create_test_state() -> AppState {
    AppState::new(Arc::new(MemoryRepository::new()), AppConfig::default())
}

/// Inserts a customer directly through the repository; the hash is never checked here.
async fn seed_user(state: &AppState, email: &str) -> i64 {
    state
        .repo
        .create_user(NewUser {
            username: "tester".to_string(),
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            roles_id: 2,
        })
        .await
        .unwrap()
        .id
}

fn parts_with_auth(value: Option<&str>) -> axum::http::request::Parts {
    let mut builder = Request::builder().uri("/categories");
    if let Some(value) = value {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let (parts, _) = builder.body(()).unwrap().into_parts();
    parts
}

async fn error_message(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice::<ErrorBody>(&bytes).unwrap().error
}

// --- EXTRACTOR TESTS ---

#[test]
async fn test_valid_token_resolves_user() {
    let state = create_test_state();
    let user_id = seed_user(&state, "alice@example.com").await;
    let issued = state.tokens.issue(user_id).unwrap();

    let mut parts = parts_with_auth(Some(&format!("Bearer {}", issued.token)));
    let user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();

    assert_eq!(user, AuthUser { id: user_id, roles_id: 2 });
}

#[test]
async fn test_missing_header_is_unauthorized() {
    let state = create_test_state();

    let mut parts = parts_with_auth(None);
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(result.err().unwrap(), AppError::unauthorized("Unauthorized Access"));
}

#[test]
async fn test_non_bearer_scheme_is_unauthorized() {
    let state = create_test_state();

    let mut parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(result.err().unwrap(), AppError::unauthorized("Unauthorized Access"));
}

#[test]
async fn test_garbage_token_is_rejected() {
    let state = create_test_state();

    let mut parts = parts_with_auth(Some("Bearer not.a.token"));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(result.err().unwrap(), AppError::unauthorized("Token Invalid or Expired"));
}

#[test]
async fn test_expired_token_is_rejected() {
    let state = create_test_state();
    let user_id = seed_user(&state, "alice@example.com").await;
    let issued = state
        .tokens
        .issue_at(user_id, Utc::now() - Duration::hours(3))
        .unwrap();

    let mut parts = parts_with_auth(Some(&format!("Bearer {}", issued.token)));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(result.err().unwrap().status(), StatusCode::UNAUTHORIZED);
}

#[test]
async fn test_token_from_other_secret_is_rejected() {
    let state = create_test_state();
    let user_id = seed_user(&state, "alice@example.com").await;
    let foreign = catalog_api::TokenService::with_default_ttl("some-other-secret-entirely")
        .issue(user_id)
        .unwrap();

    let mut parts = parts_with_auth(Some(&format!("Bearer {}", foreign.token)));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(result.err().unwrap(), AppError::unauthorized("Token Invalid or Expired"));
}

#[test]
async fn test_inactive_user_loses_access() {
    let state = create_test_state();
    let user_id = seed_user(&state, "alice@example.com").await;
    let issued = state.tokens.issue(user_id).unwrap();

    state
        .repo
        .update_user(
            user_id,
            UserChanges {
                is_active: Some(false),
                ..UserChanges::default()
            },
        )
        .await
        .unwrap();

    let mut parts = parts_with_auth(Some(&format!("Bearer {}", issued.token)));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(result.err().unwrap(), AppError::unauthorized("Token Invalid or Expired"));
}

#[test]
async fn test_deleted_user_loses_access() {
    let state = create_test_state();
    let user_id = seed_user(&state, "alice@example.com").await;
    let issued = state.tokens.issue(user_id).unwrap();
    state.repo.delete_user(user_id).await.unwrap();

    let mut parts = parts_with_auth(Some(&format!("Bearer {}", issued.token)));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(result.err().unwrap().status(), StatusCode::UNAUTHORIZED);
}

// --- ROUTER TESTS ---

#[test]
async fn test_health_is_public() {
    let app = create_router(create_test_state());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[test]
async fn test_protected_route_without_token() {
    let app = create_router(create_test_state());

    let response = app
        .oneshot(Request::builder().uri("/categories").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(response).await, "Unauthorized Access");
}

#[test]
async fn test_user_listing_requires_token_but_registration_does_not() {
    let state = create_test_state();

    let listing = create_router(state.clone())
        .oneshot(Request::builder().uri("/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(listing.status(), StatusCode::UNAUTHORIZED);

    let body = serde_json::json!({
        "username": "alice",
        "email": "alice@example.com",
        "password": "Sup3r.Secret",
        "roles_id": 2
    });
    let registration = create_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/users")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(registration.status(), StatusCode::CREATED);
}

#[test]
async fn test_protected_route_with_valid_token() {
    let state = create_test_state();
    let user_id = seed_user(&state, "alice@example.com").await;
    let issued = state.tokens.issue(user_id).unwrap();

    let response = create_router(state)
        .oneshot(
            Request::builder()
                .uri("/categories")
                .header(header::AUTHORIZATION, format!("Bearer {}", issued.token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
async fn test_malformed_body_is_bad_request() {
    let state = create_test_state();
    let user_id = seed_user(&state, "alice@example.com").await;
    let issued = state.tokens.issue(user_id).unwrap();

    let response = create_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/categories")
                .header(header::AUTHORIZATION, format!("Bearer {}", issued.token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"name\": "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Invalid data");
}

#[test]
async fn test_invalid_path_id_is_bad_request() {
    let state = create_test_state();
    let user_id = seed_user(&state, "alice@example.com").await;
    let issued = state.tokens.issue(user_id).unwrap();

    let response = create_router(state)
        .oneshot(
            Request::builder()
                .uri("/products/abc")
                .header(header::AUTHORIZATION, format!("Bearer {}", issued.token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Invalid ID");
}

#[test]
async fn test_rate_limit_rejects_burst() {
    let config = AppConfig {
        rate_limit_rps: 1,
        ..AppConfig::default()
    };
    let app = create_router(AppState::new(Arc::new(MemoryRepository::new()), config));

    let first = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let second = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_message(second).await, "Too Many Requests");
}
