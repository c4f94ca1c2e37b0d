//! Chat API handlers.
//!
//! Endpoints:
//!
//! - `POST /api/chat`: conversation history in, plain text stream out
//! - `POST /api/chat/stream`: same input, SSE stream of orchestrator events
//! - `GET  /api/tools`: tools exposed to the model
//! - `GET  /health`: liveness probe

use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::sse::{Event as SseEvent, Sse},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

use haru_agent::{AgentStreamEvent, ChatOrchestrator};
use haru_core::message::{ChatMessage, ChatRole};
use haru_core::provider::ToolDefinition;

/// Shown to the user when the model could not be reached at all.
const CHAT_FAILED: &str = "챗봇 응답 생성 중 오류가 발생했습니다. 서버 로그를 확인해주세요.";
/// Ends a plain-text reply when the turn fails after the response has started.
const CHAT_INTERRUPTED: &str = "응답 중 오류가 발생했습니다. 잠시 후 다시 시도해주세요.";
const EMPTY_HISTORY: &str = "메시지가 비어 있습니다.";

/// Shared state for the API routes. Read-only after startup.
pub struct ApiState {
    pub orchestrator: ChatOrchestrator,
}

pub type SharedState = Arc<ApiState>;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Validate the history and open the first model round.
async fn start_turn(
    state: &ApiState,
    messages: Vec<ChatMessage>,
) -> Result<mpsc::Receiver<AgentStreamEvent>, ApiError> {
    if !messages
        .iter()
        .any(|m| m.role == ChatRole::User && !m.content.trim().is_empty())
    {
        return Err(api_error(StatusCode::BAD_REQUEST, EMPTY_HISTORY));
    }

    info!(messages = messages.len(), "Chat request");

    state.orchestrator.run_stream(messages).await.map_err(|e| {
        error!(error = %e, "Chat turn failed before streaming");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, CHAT_FAILED)
    })
}

/// `POST /api/chat`: stream the model's text as it arrives.
pub async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let rx = start_turn(&state, payload.messages).await?;

    let mut wrote_text = false;
    let text = ReceiverStream::new(rx).filter_map(move |event| match event {
        AgentStreamEvent::Chunk { content } => {
            wrote_text |= !content.is_empty();
            Some(Ok::<_, Infallible>(content))
        }
        AgentStreamEvent::Error { message } => {
            warn!(error = %message, "Chat stream ended early");
            let notice = if wrote_text {
                format!("\n\n{CHAT_INTERRUPTED}")
            } else {
                CHAT_INTERRUPTED.to_string()
            };
            Some(Ok(notice))
        }
        _ => None,
    });

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(text),
    )
        .into_response())
}

/// `POST /api/chat/stream`: every orchestrator event as an SSE event.
pub async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let rx = start_turn(&state, payload.messages).await?;

    let stream = ReceiverStream::new(rx).map(|event| {
        let event_type = event.event_type();
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(event_type).data(data))
    });

    Ok(Sse::new(stream))
}

#[derive(Serialize)]
pub struct ToolsResponse {
    tools: Vec<ToolDefinition>,
}

/// `GET /api/tools`
pub async fn tools_handler(State(state): State<SharedState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: state.orchestrator.tool_definitions(),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
