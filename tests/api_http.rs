// tests/api_http.rs
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use intel_terminal::upstream::{GenerateResponse, MockBackend};
use intel_terminal::UplinkConfig;
use serde_json::Value;
use tower::ServiceExt;

fn build_app() -> Router {
    let backend = Arc::new(MockBackend::new(|_, _| {
        Ok(GenerateResponse::text("Markets are calm.").with_grounding("Desk", "https://desk.example"))
    }));
    intel_terminal::app(&UplinkConfig::default(), backend)
        .expect("app should assemble in tests")
        .router
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    // axum::body::to_bytes requires an explicit limit
    let bytes = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let app = build_app();
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn dashboard_exposes_full_read_model() {
    let app = build_app();
    let (status, json) = send(&app, Request::get("/dashboard").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["activeCategory"], "MARKETS");
    assert_eq!(json["autoRefreshEnabled"], true);
    assert_eq!(json["alert"], Value::Null);
    for feed in ["ticker", "macro", "news", "social", "events"] {
        assert_eq!(json[feed]["lastSyncTime"], "NEVER", "{feed}");
        assert_eq!(json[feed]["loading"], false, "{feed}");
    }
    assert_eq!(json["nodes"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn category_input_is_validated() {
    let app = build_app();
    let (status, json) = send(&app, post_json("/category", r#"{"category":"weather"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("weather"));

    let (status, json) = send(&app, post_json("/category", r#"{"category":"defi"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["changed"], true);
    assert_eq!(json["activeCategory"], "DEFI");

    let (_, json) = send(&app, Request::get("/dashboard").body(Body::empty()).unwrap()).await;
    assert_eq!(json["activeCategory"], "DEFI");
}

#[tokio::test]
async fn toggles_search_and_resync() {
    let app = build_app();
    let (_, json) = send(&app, post_json("/auto-refresh", r#"{"enabled":false}"#)).await;
    assert_eq!(json["changed"], true);
    let (_, json) = send(&app, post_json("/auto-refresh", r#"{"enabled":false}"#)).await;
    assert_eq!(json["changed"], false);

    let (status, _) = send(&app, post_json("/social/search", r#"{"query":"  "}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, json) = send(&app, post_json("/social/search", r#"{"query":"solana"}"#)).await;
    assert_eq!(json["accepted"], true);

    let (status, json) = send(&app, Request::post("/resync").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["accepted"].is_boolean());
}

#[tokio::test]
async fn chat_round_trip_over_http() {
    let app = build_app();
    let (_, json) = send(&app, Request::get("/chat").body(Body::empty()).unwrap()).await;
    assert_eq!(json["state"], "IDLE");
    assert_eq!(json["turns"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, post_json("/chat", r#"{"message":"   "}"#)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, json) = send(&app, post_json("/chat", r#"{"message":"brief me"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["role"], "model");
    assert_eq!(json["text"], "Markets are calm.");
    assert_eq!(json["sources"][0]["uri"], "https://desk.example");

    let (_, json) = send(&app, Request::get("/chat").body(Body::empty()).unwrap()).await;
    let turns = json["turns"].as_array().unwrap();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[1]["text"], "BRIEF ME");
}

#[tokio::test]
async fn metrics_endpoint_is_mounted() {
    let app = build_app();
    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
