mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use campus_messaging::config::Config;
use campus_messaging::middleware::auth::Claims;
use campus_messaging::routes::build_router;
use campus_messaging::services::notifications::{NoopGateway, NotificationDispatcher};
use campus_messaging::services::typing::TypingTracker;
use campus_messaging::state::AppState;
use campus_messaging::store::memory::MemStore;
use campus_messaging::store::Store;

use common::seed_user;

fn test_app(store: Arc<MemStore>) -> Router {
    let store: Arc<dyn Store> = store;
    let config = Arc::new(Config::test_defaults());
    let state = AppState {
        store: store.clone(),
        typing: TypingTracker::default(),
        notifier: NotificationDispatcher::spawn(store, Arc::new(NoopGateway)),
        config,
    };
    build_router(state)
}

fn token_for(user_id: Uuid) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret("test-secret".as_bytes()),
    )
    .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_needs_no_token() {
    let app = test_app(Arc::new(MemStore::new()));
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn missing_token_yields_401_json_body() {
    let app = test_app(Arc::new(MemStore::new()));
    let response = app
        .oneshot(Request::get("/conversations").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("unauthenticated"));
    assert_eq!(body["message"], json!("missing or invalid credentials"));
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let app = test_app(Arc::new(MemStore::new()));
    let response = app
        .oneshot(
            Request::get("/conversations")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn direct_conversation_round_trip_over_http() {
    let store = Arc::new(MemStore::new());
    let alice = seed_user(&store, "Alice", None, None).await;
    let bob = seed_user(&store, "Bob", None, None).await;
    let app = test_app(store);
    let token = token_for(alice);

    let response = app
        .clone()
        .oneshot(
            Request::post("/conversations")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "type": "direct", "participant_ids": [bob] }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = body_json(response).await;
    assert_eq!(created["kind"], json!("direct"));
    let conversation_id = created["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::get("/conversations")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let listed = body_json(response).await;
    let rows = listed.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!(conversation_id));
    assert_eq!(rows[0]["other_participant"]["full_name"], json!("Bob"));
}

#[tokio::test]
async fn blocked_users_listing_carries_profiles() {
    let store = Arc::new(MemStore::new());
    let alice = seed_user(&store, "Alice", None, None).await;
    let bob = seed_user(&store, "Bob", None, None).await;
    let app = test_app(store);
    let token = token_for(alice);

    let response = app
        .clone()
        .oneshot(
            Request::post(format!("/users/{bob}/block"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(
            Request::get("/blocked-users")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let rows = body_json(response).await;
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["blocked_id"], json!(bob.to_string()));
    assert_eq!(rows[0]["blocked_user"]["full_name"], json!("Bob"));
}

#[tokio::test]
async fn domain_errors_surface_as_json() {
    let store = Arc::new(MemStore::new());
    let alice = seed_user(&store, "Alice", None, None).await;
    let app = test_app(store);

    // A direct chat with yourself is rejected before anything is stored.
    let response = app
        .oneshot(
            Request::post("/conversations")
                .header(header::AUTHORIZATION, format!("Bearer {}", token_for(alice)))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "type": "direct", "participant_ids": [alice] }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], json!("invalid_argument"));
}
