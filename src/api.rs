use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::chat::{ChatSnapshot, ConversationSession, TranscriptHandle};
use crate::model::Category;
use crate::orchestrator::{DashboardView, RefreshOrchestrator};

#[derive(Clone)]
pub struct AppState {
    orchestrator: RefreshOrchestrator,
    chat: Arc<Mutex<ConversationSession>>,
    transcript: TranscriptHandle,
}

impl AppState {
    pub fn new(orchestrator: RefreshOrchestrator, chat: ConversationSession) -> Self {
        let transcript = chat.transcript_handle();
        Self {
            orchestrator,
            chat: Arc::new(Mutex::new(chat)),
            transcript,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/dashboard", get(dashboard))
        .route("/category", post(set_category))
        .route("/social/search", post(search_social))
        .route("/auto-refresh", post(set_auto_refresh))
        .route("/resync", post(resync))
        .route("/chat", get(chat_transcript).post(chat_send))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn bad_request(msg: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg.into() }))).into_response()
}

async fn dashboard(State(state): State<AppState>) -> Json<DashboardView> {
    Json(state.orchestrator.snapshot())
}

#[derive(serde::Deserialize)]
struct CategoryReq {
    category: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryResp {
    changed: bool,
    active_category: Category,
}

async fn set_category(State(state): State<AppState>, Json(body): Json<CategoryReq>) -> Response {
    let category: Category = match body.category.parse() {
        Ok(c) => c,
        Err(e) => return bad_request(e.to_string()),
    };
    let changed = state.orchestrator.set_category(category);
    Json(CategoryResp {
        changed,
        active_category: category,
    })
    .into_response()
}

#[derive(serde::Deserialize)]
struct SearchReq {
    query: String,
}

#[derive(serde::Serialize)]
struct Accepted {
    accepted: bool,
}

async fn search_social(State(state): State<AppState>, Json(body): Json<SearchReq>) -> Response {
    if body.query.trim().is_empty() {
        return bad_request("query is empty");
    }
    Json(Accepted {
        accepted: state.orchestrator.search_social(&body.query),
    })
    .into_response()
}

#[derive(serde::Deserialize)]
struct AutoRefreshReq {
    enabled: bool,
}

#[derive(serde::Serialize)]
struct AutoRefreshResp {
    changed: bool,
    enabled: bool,
}

async fn set_auto_refresh(
    State(state): State<AppState>,
    Json(body): Json<AutoRefreshReq>,
) -> Json<AutoRefreshResp> {
    Json(AutoRefreshResp {
        changed: state.orchestrator.set_auto_refresh(body.enabled),
        enabled: body.enabled,
    })
}

async fn resync(State(state): State<AppState>) -> Json<Accepted> {
    Json(Accepted {
        accepted: state.orchestrator.resync(),
    })
}

#[derive(serde::Deserialize)]
struct ChatReq {
    message: String,
}

/// One message at a time; a second sender waits for the first exchange.
/// The exchange runs on its own task so a client hanging up does not cut it short.
async fn chat_send(State(state): State<AppState>, Json(body): Json<ChatReq>) -> Response {
    let chat = state.chat.clone();
    let exchange = tokio::spawn(async move {
        let mut session = chat.lock().await;
        session.send_user_message(&body.message).await
    });
    match exchange.await {
        Ok(Some(turn)) => Json(turn).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!(target: "chat", error = %e, "chat task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "chat task failed" })),
            )
                .into_response()
        }
    }
}

async fn chat_transcript(State(state): State<AppState>) -> Json<ChatSnapshot> {
    Json(state.transcript.snapshot())
}
