use crate::agent::RecipeAgent;
use crate::models::chat::{ ChatReply, ChatRequest, ErrorBody };
use std::path::Path;
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    extract::{ State, rejection::JsonRejection },
    response::{ IntoResponse, Response },
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tower_http::cors::{ Any, CorsLayer };
use tower_http::services::{ ServeDir, ServeFile };
use log::{ info, warn };
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<RecipeAgent>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model: String,
}

pub fn router(agent: Arc<RecipeAgent>, frontend_dir: &Path) -> Router {
    let app_state = AppState { agent };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let frontend = ServeDir::new(frontend_dir)
        .fallback(ServeFile::new(frontend_dir.join("index.html")));

    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .fallback_service(frontend)
        .layer(cors)
        .with_state(app_state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4();
    let Json(req) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            warn!("[{}] Rejected chat body: {}", request_id, rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    info!(
        "[{}] Chat request: {} prior turns, new message: {}",
        request_id,
        req.messages.len(),
        req.message.is_some()
    );

    match state.agent.get_agent_response(&req.messages, req.message.as_deref()).await {
        Ok(messages) => {
            let reply = messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            info!("[{}] Reply sent ({} chars)", request_id, reply.len());
            (StatusCode::OK, Json(ChatReply { reply, messages })).into_response()
        }
        Err(e) if e.is_client_error() => {
            warn!("[{}] Invalid chat request: {}", request_id, e);
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            warn!("[{}] Chat request failed upstream", request_id);
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        model: state.agent.model(),
    })
}
