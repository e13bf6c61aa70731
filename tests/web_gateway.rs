//! HTTP boundary tests: the three routes exercised through the router
//! without a running server.

#![cfg(feature = "web")]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use prefhub::api::{GatewayState, HeaderIdentity, preferences_router};
use prefhub::{MemoryTableStore, Preferences, PreferencesService};

fn router() -> Router {
    let service: PreferencesService = PreferencesService::new(Arc::new(MemoryTableStore::new()));
    let factory = move || service.clone();
    let state: GatewayState<Preferences> = GatewayState::new(
        Arc::new(factory),
        Arc::new(HeaderIdentity::default()),
    );
    preferences_router(state)
}

fn request(method: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri("/")
        .header("x-user-id", "u1");
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn fetch_returns_defaults_for_unknown_user() {
    let app = router();
    let response = app.oneshot(request("GET", None)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["ui"]["theme"], json!("system"));
    assert_eq!(body["ui"]["language"], json!("zh-CN"));
    assert_eq!(body["notifications"]["enabled"], json!(true));
}

#[tokio::test]
async fn patch_merges_and_returns_full_tree() {
    let app = router();

    let response = app
        .clone()
        .oneshot(request("PATCH", Some(json!({"ui": {"theme": "dark"}}))))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ui"]["theme"], json!("dark"));
    // Untouched fields come back with their defaults.
    assert_eq!(body["ui"]["timezone"], json!("Asia/Shanghai"));

    let response = app
        .oneshot(request("GET", None))
        .await
        .expect("response");
    let body = json_body(response).await;
    assert_eq!(body["ui"]["theme"], json!("dark"));
}

#[tokio::test]
async fn invalid_enum_yields_422_with_field_path() {
    let app = router();
    let response = app
        .oneshot(request("PATCH", Some(json!({"ui": {"theme": "neon"}}))))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(response).await;
    assert_eq!(body["path"], json!("ui.theme"));
    assert!(body["error"].as_str().unwrap_or_default().contains("neon"));
}

#[tokio::test]
async fn non_object_body_yields_400() {
    let app = router();
    let response = app
        .oneshot(request("PATCH", Some(json!(["not", "an", "object"]))))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_resets_to_defaults() {
    let app = router();
    app.clone()
        .oneshot(request("PATCH", Some(json!({"ui": {"theme": "dark"}}))))
        .await
        .expect("seed");

    let response = app
        .clone()
        .oneshot(request("DELETE", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["ui"]["theme"], json!("system"));

    let response = app.oneshot(request("GET", None)).await.expect("response");
    let body = json_body(response).await;
    assert_eq!(body["ui"]["theme"], json!("system"));
}

#[tokio::test]
async fn missing_identity_yields_401() {
    let app = router();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_are_isolated_per_header() {
    let app = router();
    app.clone()
        .oneshot(request("PATCH", Some(json!({"ui": {"theme": "dark"}}))))
        .await
        .expect("seed u1");

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/")
                .header("x-user-id", "u2")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let body = json_body(response).await;
    assert_eq!(body["ui"]["theme"], json!("system"));
}
