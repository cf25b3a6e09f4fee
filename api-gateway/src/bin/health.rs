//! Health Lambda - Handles GET /api/health.
//!
//! Starts without a Gemini key or a database so it can report both as
//! missing instead of failing cold start.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::chat::health;
use shared::http::json_response;
use shared::{db, resolve_api_key, Config, TranscriptStore};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

struct AppState {
    config: Config,
    has_key: bool,
    store: Option<TranscriptStore>,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;

        let has_key = match resolve_api_key(&config.gemini).await {
            Ok(key) => key.is_some(),
            Err(e) => {
                warn!(error = %e, "Failed to resolve Gemini key");
                false
            }
        };

        let store = match db::connect(&config.database).await {
            Ok(pool) => pool.map(TranscriptStore::new),
            Err(e) => {
                warn!(error = %e, "Database unavailable at start-up");
                None
            }
        };

        Ok(Self {
            config,
            has_key,
            store,
        })
    }
}

async fn handler(state: Arc<AppState>, _event: Request) -> Result<Response<Body>, Error> {
    let report = health(&state.config, state.has_key, state.store.as_ref()).await;
    json_response(200, &report)
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
