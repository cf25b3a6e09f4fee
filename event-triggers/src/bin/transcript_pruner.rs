//! Transcript Pruner Lambda - Deletes transcript messages past retention.
//!
//! Runs on an EventBridge schedule. Messages older than
//! TRANSCRIPT_RETENTION_HOURS are removed; session metrics are kept.

use chrono::Utc;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::Deserialize;
use shared::models::PruneResponse;
use shared::transcripts::retention_cutoff;
use shared::{db, Config, TranscriptStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct ScheduledEvent {
    #[serde(default, rename = "detail-type")]
    detail_type: String,
}

struct AppState {
    store: TranscriptStore,
    retention_hours: i64,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let pool = db::connect(&config.database)
            .await?
            .ok_or("No database configured for the transcript pruner")?;

        Ok(Self {
            store: TranscriptStore::new(pool),
            retention_hours: config.retention_hours,
        })
    }
}

async fn handler(
    state: Arc<AppState>,
    event: LambdaEvent<ScheduledEvent>,
) -> Result<PruneResponse, Error> {
    let cutoff = retention_cutoff(Utc::now(), state.retention_hours);
    info!(detail_type = %event.payload.detail_type, %cutoff, "Pruning transcripts");

    let messages_deleted = state.store.delete_older_than(cutoff).await?;

    info!(messages_deleted, "Transcript pruning complete");

    Ok(PruneResponse { messages_deleted })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);
    let state_clone = state.clone();

    run(service_fn(move |event| {
        let state = state_clone.clone();
        async move { handler(state, event).await }
    }))
    .await
}
