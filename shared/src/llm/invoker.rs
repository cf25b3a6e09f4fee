//! Model invoker: one guarded call per candidate, tried strictly in order.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{info, warn};

use super::backend::{GenerateRequest, GenerativeBackend};
use super::candidates::ModelCandidates;
use super::extract::extract_json;
use super::failure::InvocationFailure;
use super::guard::with_timeout;

/// A parsed answer and the candidate that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub model: String,
    pub output: Map<String, Value>,
}

/// Drives a [`GenerativeBackend`] across an ordered candidate list.
#[derive(Clone)]
pub struct ModelInvoker {
    backend: Arc<dyn GenerativeBackend>,
    candidates: ModelCandidates,
    deadline: Duration,
}

impl ModelInvoker {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        candidates: ModelCandidates,
        deadline: Duration,
    ) -> Self {
        Self {
            backend,
            candidates,
            deadline,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.backend.provider_name()
    }

    pub fn candidates(&self) -> &ModelCandidates {
        &self.candidates
    }

    /// Issue one generation call for `model` and extract its JSON object.
    pub async fn invoke(
        &self,
        model: &str,
        prompt: &str,
        response_schema: Option<&Value>,
    ) -> Result<Map<String, Value>, InvocationFailure> {
        let request = GenerateRequest {
            model,
            prompt,
            response_schema,
        };
        let raw = with_timeout(self.backend.generate(request), self.deadline).await?;
        extract_json(&raw)
    }

    /// Try each candidate until one answers.
    ///
    /// Retryable failures advance to the next candidate; any other failure
    /// stops immediately. When every candidate fails retryably the last
    /// failure is wrapped in [`InvocationFailure::ExhaustedCandidates`].
    pub async fn invoke_first_available(
        &self,
        prompt: &str,
        response_schema: Option<&Value>,
    ) -> Result<Answer, InvocationFailure> {
        let mut last = None;

        for (attempt, model) in self.candidates.iter().enumerate() {
            match self.invoke(model, prompt, response_schema).await {
                Ok(output) => {
                    info!(
                        provider = self.provider_name(),
                        model,
                        attempt = attempt + 1,
                        "model answered"
                    );
                    return Ok(Answer {
                        model: model.to_string(),
                        output,
                    });
                }
                Err(failure) if failure.is_retryable() => {
                    warn!(
                        provider = self.provider_name(),
                        model,
                        error = %failure,
                        "candidate unavailable, trying next"
                    );
                    last = Some(failure);
                }
                Err(failure) => return Err(failure),
            }
        }

        let last = last.unwrap_or_else(|| InvocationFailure::Transport("no candidate models".into()));
        Err(InvocationFailure::ExhaustedCandidates {
            last: Box::new(last),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedBackend;

    fn invoker(backend: Arc<ScriptedBackend>, fallbacks: &[&str]) -> ModelInvoker {
        ModelInvoker::new(
            backend,
            ModelCandidates::with_fallbacks(None, fallbacks),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(r#"{"a":1}"#.into())]));
        let answer = invoker(backend.clone(), &["m1", "m2"])
            .invoke_first_available("p", None)
            .await
            .unwrap();
        assert_eq!(answer.model, "m1");
        assert_eq!(backend.calls(), vec!["m1"]);
    }

    #[tokio::test]
    async fn test_retryable_advances_fatal_stops() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok("no json at all".into()),
            Ok("{\"a\": }".into()),
        ]));
        let err = invoker(backend.clone(), &["m1", "m2", "m3"])
            .invoke_first_available("p", None)
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationFailure::InvalidJson { .. }));
        assert_eq!(backend.calls(), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_exhaustion_wraps_last_failure() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(InvocationFailure::Timeout { deadline_ms: 1 }),
            Err(InvocationFailure::ProviderRejected {
                status: 429,
                status_text: "RESOURCE_EXHAUSTED".into(),
                message: "quota".into(),
            }),
        ]));
        let err = invoker(backend.clone(), &["m1", "m2"])
            .invoke_first_available("p", None)
            .await
            .unwrap_err();
        match err {
            InvocationFailure::ExhaustedCandidates { last } => assert_eq!(last.status(), Some(429)),
            other => panic!("unexpected failure: {other:?}"),
        }
        assert_eq!(backend.calls(), vec!["m1", "m2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out_then_falls_through() {
        let backend = Arc::new(
            ScriptedBackend::new(vec![Ok(r#"{"late":true}"#.into()), Ok(r#"{"ok":true}"#.into())])
                .with_delay(Duration::from_secs(30), 1),
        );
        let answer = invoker(backend.clone(), &["slow", "fast"])
            .invoke_first_available("p", None)
            .await
            .unwrap();
        assert_eq!(answer.model, "fast");
        assert_eq!(answer.output["ok"], serde_json::json!(true));
        assert_eq!(backend.calls(), vec!["slow", "fast"]);
    }
}
