//! Summary Lambda - Handles POST /api/summary.
//!
//! Accepts `{ sessionId }` for stored sessions or `{ transcript }` from
//! stateless clients. A failed summary is reported as SUMMARY_ERROR; no
//! summary is invented.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{bad_request, error_response, failure_response, json_response};
use shared::models::validate_request;
use shared::{parse_body, ChatService, Config, SummaryRequest};
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

    let request: SummaryRequest = parse_body!(event.body());
    if let Err(issues) = validate_request(&request) {
        return bad_request(issues);
    }

    info!(
        session_id = ?request.session_id,
        transcript_len = request.transcript.as_ref().map(Vec::len),
        "Summary request"
    );

    match state.service.summary(&request).await {
        Ok(summary) => json_response(200, &summary),
        Err(e) => {
            error!(error = %e, "Summary failed");
            failure_response(&e, "SUMMARY_ERROR")
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
