//! Diagnostics Lambda - Handles GET /api/diag/gemini and GET /api/diag/env.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::chat::{env_diag, gemini_diag};
use shared::http::{error_response, json_response};
use shared::{resolve_api_key, Config};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct AppState {
    config: Config,
    api_key: Option<String>,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let api_key = resolve_api_key(&config.gemini).await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to resolve Gemini key");
            None
        });
        Ok(Self { config, api_key })
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let path = event.uri().path();
    info!("Diag request: {}", path);

    if path.ends_with("/diag/gemini") {
        let report = gemini_diag(&state.config, state.api_key.as_deref()).await;
        json_response(200, &report)
    } else if path.ends_with("/diag/env") {
        json_response(200, &env_diag(&state.config, state.api_key.as_deref()))
    } else {
        error_response(404, "NOT_FOUND")
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
