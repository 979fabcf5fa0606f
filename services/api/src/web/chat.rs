//! services/api/src/web/chat.rs

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::{reject, Rejection};
use crate::web::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
    pub subject: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub reply: String,
    /// `cache`, `local` or `remote`.
    pub source: String,
}

/// POST /chat - Ask the study assistant
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "The assistant's reply", body = ChatResponse),
        (status = 400, description = "Empty message")
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, Rejection> {
    let subject = req.subject.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let reply = state
        .chat
        .reply(&req.message, subject)
        .await
        .map_err(|e| reject("Chat", e))?;

    Ok(Json(ChatResponse {
        reply: reply.text,
        source: reply.source.as_str().to_string(),
    }))
}
