//! Request flows shared by every deployment adapter.
//!
//! Adapters only parse and validate the request, then call into
//! [`ChatService`]. Transcript writes are best effort: a failing store is
//! logged and never blocks a reply.

use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::companion::{Companion, HistoryMessage, Role, SummaryError, SummaryResult};
use crate::config::Config;
use crate::db;
use crate::llm::{with_timeout, GeminiClient, ModelCandidates};
use crate::models::{
    ChatRequest, ChatResponse, DatabaseStatus, EndSessionRequest, EnvDiag, EnvFlags, GeminiDiag,
    HealthResponse, SampleGenerate, SummaryRequest,
};
use crate::secrets::resolve_api_key;
use crate::transcripts::TranscriptStore;
use crate::{Error, Result};

const KEY_PREFIX_CHARS: usize = 6;
const DIAG_LISTED_NAMES: usize = 20;
const DIAG_SAMPLE_PROMPT: &str = "Say hello in five words.";

#[derive(Clone)]
pub struct ChatService {
    companion: Companion,
    store: Option<TranscriptStore>,
    history_limit: i64,
    transcript_limit: i64,
    prune_on_end: bool,
}

impl ChatService {
    pub fn new(config: &Config, companion: Companion, store: Option<TranscriptStore>) -> Self {
        Self {
            companion,
            store,
            history_limit: config.history_limit,
            transcript_limit: config.transcript_limit,
            prune_on_end: config.prune_on_end,
        }
    }

    /// Resolve the key, build the Gemini companion and connect the store.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let api_key = resolve_api_key(&config.gemini).await?;
        let companion = Companion::gemini(&config.gemini, api_key.as_deref())?;
        let store = db::connect(&config.database).await?.map(TranscriptStore::new);
        Ok(Self::new(config, companion, store))
    }

    pub fn store(&self) -> Option<&TranscriptStore> {
        self.store.as_ref()
    }

    /// Run one turn. Always produces a reply.
    pub async fn chat(&self, request: &ChatRequest) -> ChatResponse {
        let started = Instant::now();
        let session_id = request.session_id.as_str();

        self.record(session_id, Role::User, &request.text).await;
        let history = self.history(session_id).await;

        let reply = self
            .companion
            .turns
            .run_turn(&request.text, &history, request.tone, request.intent)
            .await;

        self.record(session_id, Role::Ai, &reply.transcript_text(request.intent))
            .await;

        let latency_ms = started.elapsed().as_millis() as u64;
        info!(
            session_id,
            latency_ms,
            fallback = reply.is_fallback(),
            "Chat turn complete"
        );

        ChatResponse {
            diagnostics: reply.diagnostics().cloned(),
            result: reply.result,
            latency_ms,
        }
    }

    /// Summarize a stored session, or the transcript sent by the client.
    pub async fn summary(&self, request: &SummaryRequest) -> Result<SummaryResult> {
        let transcript = self.summary_transcript(request).await?;
        let reply = self.companion.summaries.run_summary(&transcript).await?;
        Ok(reply.result)
    }

    /// Both sources are capped to the first `transcript_limit` messages.
    async fn summary_transcript(&self, request: &SummaryRequest) -> Result<Vec<HistoryMessage>> {
        if let Some(transcript) = request.transcript.as_ref().filter(|t| !t.is_empty()) {
            let limit = usize::try_from(self.transcript_limit).unwrap_or(0);
            return Ok(transcript.iter().take(limit).cloned().collect());
        }

        match (&request.session_id, &self.store) {
            (Some(session_id), Some(store)) => {
                let transcript = store.transcript(session_id, self.transcript_limit).await?;
                if transcript.is_empty() {
                    return Err(SummaryError::EmptyTranscript.into());
                }
                Ok(transcript)
            }
            (Some(_), None) => Err(Error::Validation(
                "no transcript store configured; send the transcript instead".to_string(),
            )),
            (None, _) => Err(Error::Validation(
                "send { sessionId } or { transcript: [{role, content}] }".to_string(),
            )),
        }
    }

    /// Record session metrics and prune its messages. Stateless
    /// deployments accept and ignore the request.
    pub async fn end_session(&self, request: &EndSessionRequest) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        store.upsert_metrics(&request.session_id, &request.stats).await?;

        if self.prune_on_end {
            let deleted = store.delete_session(&request.session_id).await?;
            info!(session_id = %request.session_id, deleted, "Session pruned");
        }

        Ok(())
    }

    async fn record(&self, session_id: &str, role: Role, content: &str) {
        if let Some(store) = &self.store {
            if let Err(e) = store.append(session_id, role, content).await {
                warn!(session_id, role = role.as_str(), error = %e, "Failed to store message");
            }
        }
    }

    async fn history(&self, session_id: &str) -> Vec<HistoryMessage> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        match store.recent_history(session_id, self.history_limit).await {
            Ok(history) => history,
            Err(e) => {
                warn!(session_id, error = %e, "Failed to load history");
                Vec::new()
            }
        }
    }
}

/// Liveness report. Never fails.
pub async fn health(config: &Config, has_key: bool, store: Option<&TranscriptStore>) -> HealthResponse {
    let database = match store {
        None if config.database.is_configured() => DatabaseStatus::Unreachable,
        None => DatabaseStatus::Disabled,
        Some(store) => match db::ping(store.pool()).await {
            Ok(()) => DatabaseStatus::Connected,
            Err(e) => {
                error!(error = %e, "Database ping failed");
                DatabaseStatus::Unreachable
            }
        },
    };

    HealthResponse {
        ok: true,
        model: config.model_label().to_string(),
        database,
        time: Utc::now(),
        env: EnvFlags {
            has_key,
            has_database: config.database.is_configured(),
        },
    }
}

/// Configuration report without revealing the key.
pub fn env_diag(config: &Config, api_key: Option<&str>) -> EnvDiag {
    let key = api_key.map(str::trim).unwrap_or_default();
    EnvDiag {
        has_key: !key.is_empty(),
        key_len: key.chars().count(),
        key_prefix: key.chars().take(KEY_PREFIX_CHARS).collect(),
        model: config.model_label().to_string(),
        cors: config.cors_origins.clone(),
    }
}

/// List visible models and run one tiny plain generation with the first
/// candidate. Both calls share the configured deadline.
pub async fn gemini_diag(config: &Config, api_key: Option<&str>) -> GeminiDiag {
    let client = match GeminiClient::new(
        api_key.unwrap_or_default(),
        &config.gemini.base_url,
        &config.gemini.api_version,
    ) {
        Ok(client) => client,
        Err(e) => {
            return GeminiDiag {
                sample_error: Some(e.to_string()),
                ..Default::default()
            }
        }
    };

    let deadline = config.gemini.timeout;
    let mut diag = GeminiDiag::default();

    match with_timeout(client.list_models(), deadline).await {
        Ok(names) => {
            diag.list_ok = true;
            diag.list_count = names.len();
            diag.names = names.into_iter().take(DIAG_LISTED_NAMES).collect();
        }
        Err(e) => warn!(error = %e, "Model listing failed"),
    }

    let candidates = ModelCandidates::build(config.gemini.model.as_deref());
    let model = candidates.primary();
    match with_timeout(client.generate_text(model, DIAG_SAMPLE_PROMPT), deadline).await {
        Ok(text) => {
            diag.sample_generate = SampleGenerate {
                ok: true,
                text: Some(text),
            };
        }
        Err(e) => diag.sample_error = Some(format!("{}: {}", model, e)),
    }

    diag.ok = diag.list_ok && diag.sample_generate.ok;
    diag
}
