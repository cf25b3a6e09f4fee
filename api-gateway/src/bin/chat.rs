//! Chat Lambda - Handles POST /api/chat.
//!
//! Stores the user message, runs one companion turn against the recent
//! history, stores the reply and returns it. Orchestration failures never
//! surface as errors; the body is always a turn result.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{bad_request, error_response, json_response};
use shared::models::validate_request;
use shared::{parse_body, ChatRequest, ChatService, Config};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct AppState {
    service: ChatService,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let service = ChatService::from_config(&config).await?;
        Ok(Self { service })
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    if event.method().as_str() != "POST" {
        return error_response(405, "METHOD_NOT_ALLOWED");
    }

    let request: ChatRequest = parse_body!(event.body());
    if let Err(issues) = validate_request(&request) {
        return bad_request(issues);
    }

    info!(session_id = %request.session_id, tone = %request.tone, intent = %request.intent, "Chat request");

    let response = state.service.chat(&request).await;
    json_response(200, &response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
