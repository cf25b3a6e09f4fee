//! End-of-session summary.
//!
//! Unlike a turn there is no canned summary: total failure is returned to
//! the caller as [`SummaryError`].

use thiserror::Error;
use tracing::{error, info};

use super::prompt::{build_summary_prompt, summary_response_schema};
use super::types::{HistoryMessage, SummaryResult};
use crate::llm::{InvocationFailure, ModelInvoker};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SummaryError {
    #[error("transcript is empty")]
    EmptyTranscript,

    #[error("summary generation failed: {0}")]
    Invocation(#[from] InvocationFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReply {
    pub result: SummaryResult,
    pub model: String,
}

#[derive(Clone)]
pub struct SummaryOrchestrator {
    invoker: ModelInvoker,
}

impl SummaryOrchestrator {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self { invoker }
    }

    pub async fn run_summary(
        &self,
        transcript: &[HistoryMessage],
    ) -> Result<SummaryReply, SummaryError> {
        if transcript.is_empty() {
            return Err(SummaryError::EmptyTranscript);
        }

        let prompt = build_summary_prompt(transcript);
        let schema = summary_response_schema();

        let answer = self
            .invoker
            .invoke_first_available(&prompt, Some(&schema))
            .await
            .map_err(|failure| {
                error!(
                    provider = self.invoker.provider_name(),
                    status = ?failure.status(),
                    error = %failure,
                    "summary failed"
                );
                failure
            })?;

        info!(model = %answer.model, messages = transcript.len(), "session summarized");

        Ok(SummaryReply {
            result: SummaryResult::from_output(&answer.output),
            model: answer.model,
        })
    }
}
