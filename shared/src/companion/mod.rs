//! Listening-companion core: prompts, crisis screen and the orchestrators.

pub mod crisis;
pub mod prompt;
pub mod summary;
pub mod turn;
pub mod types;

use std::sync::Arc;

pub use crisis::{crisis_response, CrisisScreen, PhraseScreen, DEFAULT_CRISIS_PHRASES};
pub use summary::{SummaryError, SummaryOrchestrator, SummaryReply};
pub use turn::{
    fallback_response, FallbackDiagnostics, TurnOrchestrator, TurnOutcome, TurnReply,
    FALLBACK_BUBBLE,
};
pub use types::{
    HistoryMessage, Intent, PromptContext, Role, SummaryResult, Tone, TurnResult,
    MAX_ACTION_STEPS, MAX_SUMMARY_POINTS, MAX_TAGS,
};

use crate::config::GeminiConfig;
use crate::llm::{GeminiClient, GenerativeBackend, InvocationFailure, ModelCandidates, ModelInvoker};

/// Turn and summary orchestrators sharing one backend and candidate list.
#[derive(Clone)]
pub struct Companion {
    pub turns: TurnOrchestrator,
    pub summaries: SummaryOrchestrator,
}

impl Companion {
    /// Build against Gemini. Fails with `MissingCredential` before any
    /// network call when `api_key` is absent or blank.
    pub fn gemini(config: &GeminiConfig, api_key: Option<&str>) -> Result<Self, InvocationFailure> {
        let client = GeminiClient::new(
            api_key.unwrap_or_default(),
            &config.base_url,
            &config.api_version,
        )?;
        Ok(Self::with_backend(config, Arc::new(client)))
    }

    pub fn with_backend(config: &GeminiConfig, backend: Arc<dyn GenerativeBackend>) -> Self {
        let invoker = ModelInvoker::new(
            backend,
            ModelCandidates::build(config.model.as_deref()),
            config.timeout,
        );
        Self {
            turns: TurnOrchestrator::new(invoker.clone()),
            summaries: SummaryOrchestrator::new(invoker),
        }
    }

    pub fn invoker(&self) -> &ModelInvoker {
        self.turns.invoker()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn gemini_config(model: Option<&str>) -> GeminiConfig {
        GeminiConfig {
            api_key: None,
            secret_arn: None,
            model: model.map(str::to_string),
            base_url: "https://example.test".into(),
            api_version: "v1beta".into(),
            timeout: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_missing_key_fails_at_construction() {
        let config = gemini_config(None);
        assert!(matches!(
            Companion::gemini(&config, None),
            Err(InvocationFailure::MissingCredential)
        ));
        assert!(matches!(
            Companion::gemini(&config, Some("  ")),
            Err(InvocationFailure::MissingCredential)
        ));
    }

    #[test]
    fn test_preference_leads_candidates() {
        let companion = Companion::gemini(&gemini_config(Some("custom-model")), Some("k")).unwrap();
        let invoker = companion.invoker();
        assert_eq!(invoker.candidates().primary(), "custom-model");
        assert_eq!(invoker.provider_name(), "gemini");
    }
}
