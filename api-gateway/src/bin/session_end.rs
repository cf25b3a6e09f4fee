//! Session End Lambda - Handles POST /api/session/end.
//!
//! Records the client's session metrics and, when PRUNE_ON_END is set,
//! deletes the session's transcript. Responds 204.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{bad_request, empty_response, error_response, failure_response};
use shared::models::validate_request;
use shared::{parse_body, ChatService, Config, EndSessionRequest};
use std::sync::Arc;
use tracing::{error, info};
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

    let request: EndSessionRequest = parse_body!(event.body());
    if let Err(issues) = validate_request(&request) {
        return bad_request(issues);
    }

    info!(
        session_id = %request.session_id,
        turns = request.stats.turns,
        error_count = request.stats.error_count,
        "Session end"
    );

    match state.service.end_session(&request).await {
        Ok(()) => empty_response(204),
        Err(e) => {
            error!(error = %e, "Failed to end session");
            failure_response(&e, "END_SESSION_ERROR")
        }
    }
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
