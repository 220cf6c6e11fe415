//! Route handlers

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect},
    Form, Json,
};
use mcpchat_core::ServiceError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::session::{current_conversation, set_cookie};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SendForm {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET / - recent conversations, the current one and its messages
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let overview = state.service.overview(current_conversation(&headers)).await?;
    let cookie = set_cookie(overview.current_conversation.id);
    Ok(([cookie], Json(overview)))
}

/// POST /send/ - answer a message in the current conversation
pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SendForm>,
) -> Result<impl IntoResponse, ApiError> {
    let message = form.message.trim();
    if message.is_empty() {
        return Err(ServiceError::EmptyMessage.into());
    }
    let conversation_id =
        current_conversation(&headers).ok_or_else(|| ApiError::NotFound("No active conversation".to_string()))?;

    debug!(conversation_id, "Message received");
    let exchange = state.service.send(conversation_id, message).await.map_err(|e| match e {
        ServiceError::Store(_) | ServiceError::Chat(_) => {
            ApiError::Internal(format!("Error processing message: {}", e))
        }
        other => other.into(),
    })?;

    Ok(Json(exchange))
}

/// GET /new/ - start a conversation and make it current
pub async fn new_conversation(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let conversation = state.service.new_conversation().await?;
    Ok(([set_cookie(conversation.id)], Redirect::to("/")))
}

/// GET /switch/:id/ - make an existing conversation current
pub async fn switch_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation = state.service.switch(conversation_id).await?;
    info!(conversation_id = conversation.id, "Switched conversation");
    Ok(([set_cookie(conversation.id)], Redirect::to("/")))
}

/// GET /debug/tools/ - every registered tool and resource
pub async fn debug_tools(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.tool_listing().await)
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
