//! One chat turn: crisis screen, prompt, candidate loop, normalization.
//!
//! [`TurnOrchestrator::run_turn`] never fails. Anything that escapes the
//! candidate loop is logged and replaced by a canned fallback reply.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use super::crisis::{crisis_response, CrisisScreen, PhraseScreen};
use super::prompt::{build_turn_prompt, turn_response_schema};
use super::types::{HistoryMessage, Intent, PromptContext, Tone, TurnResult};
use crate::llm::{InvocationFailure, ModelInvoker};

const FALLBACK_PARAPHRASE: &str = "I might be having trouble responding right now.";
const FALLBACK_FOLLOW_UP: &str = "Would you like to try again or share more in a different way?";

/// Stored in the transcript in place of a real reply when the turn fell back.
pub const FALLBACK_BUBBLE: &str = "[fallback] I had trouble responding. Want to try again?";

/// Observability fields attached to a fallback reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackDiagnostics {
    pub error: bool,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_status_text: Option<String>,
    pub provider_message: String,
}

impl FallbackDiagnostics {
    fn from_failure(provider: &str, failure: &InvocationFailure) -> Self {
        Self {
            error: true,
            provider: provider.to_string(),
            provider_status: failure.status(),
            provider_status_text: failure.status_text().map(str::to_string),
            provider_message: diagnostic_message(failure),
        }
    }
}

fn diagnostic_message(failure: &InvocationFailure) -> String {
    match failure {
        InvocationFailure::ProviderRejected { message, .. } => message.clone(),
        InvocationFailure::ExhaustedCandidates { last } => diagnostic_message(last),
        other => other.to_string(),
    }
}

/// How a turn reached its reply.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The crisis screen matched; no model was called.
    Crisis,
    /// A candidate answered.
    Answered { model: String },
    /// Every real attempt failed.
    Fallback(FallbackDiagnostics),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub result: TurnResult,
    pub outcome: TurnOutcome,
}

impl TurnReply {
    pub fn diagnostics(&self) -> Option<&FallbackDiagnostics> {
        match &self.outcome {
            TurnOutcome::Fallback(diagnostics) => Some(diagnostics),
            _ => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, TurnOutcome::Fallback(_))
    }

    /// Text stored in the transcript for this reply.
    pub fn transcript_text(&self, intent: Intent) -> String {
        if self.is_fallback() {
            FALLBACK_BUBBLE.to_string()
        } else {
            self.result.to_transcript_text(intent)
        }
    }
}

/// The canned reply used when no candidate answered.
pub fn fallback_response() -> TurnResult {
    TurnResult {
        paraphrase: FALLBACK_PARAPHRASE.to_string(),
        follow_up: Some(FALLBACK_FOLLOW_UP.to_string()),
        action_steps: Vec::new(),
        tags: vec!["Transparency".to_string()],
    }
}

#[derive(Clone)]
pub struct TurnOrchestrator {
    invoker: ModelInvoker,
    screen: Arc<dyn CrisisScreen>,
}

impl TurnOrchestrator {
    /// Orchestrator with the default phrase screen.
    pub fn new(invoker: ModelInvoker) -> Self {
        Self::with_screen(invoker, Arc::new(PhraseScreen::default()))
    }

    pub fn with_screen(invoker: ModelInvoker, screen: Arc<dyn CrisisScreen>) -> Self {
        Self { invoker, screen }
    }

    pub fn invoker(&self) -> &ModelInvoker {
        &self.invoker
    }

    pub async fn run_turn(
        &self,
        user_text: &str,
        history: &[HistoryMessage],
        tone: Tone,
        intent: Intent,
    ) -> TurnReply {
        if self.screen.is_crisis(user_text) {
            info!("crisis phrase detected, returning safe response");
            return TurnReply {
                result: crisis_response(),
                outcome: TurnOutcome::Crisis,
            };
        }

        let prompt = build_turn_prompt(&PromptContext {
            tone,
            intent,
            history,
            user_text,
        });
        let schema = turn_response_schema();

        match self.invoker.invoke_first_available(&prompt, Some(&schema)).await {
            Ok(answer) => TurnReply {
                result: TurnResult::from_output(&answer.output),
                outcome: TurnOutcome::Answered {
                    model: answer.model,
                },
            },
            Err(failure) => {
                let diagnostics =
                    FallbackDiagnostics::from_failure(self.invoker.provider_name(), &failure);
                error!(
                    provider = %diagnostics.provider,
                    status = ?diagnostics.provider_status,
                    status_text = ?diagnostics.provider_status_text,
                    error = %failure,
                    "turn failed, returning fallback reply"
                );
                TurnReply {
                    result: fallback_response(),
                    outcome: TurnOutcome::Fallback(diagnostics),
                }
            }
        }
    }
}
