//! Scripted in-memory backend for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::backend::{GenerateRequest, GenerativeBackend};
use super::failure::InvocationFailure;

/// Replays canned results in order and records which models were asked.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<String, InvocationFailure>>>,
    calls: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<(Duration, usize)>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<String, InvocationFailure>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Delay the first `calls` responses by `delay`.
    pub fn with_delay(mut self, delay: Duration, calls: usize) -> Self {
        self.delay = Some((delay, calls));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<String, InvocationFailure> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.model.to_string());
            calls.len()
        };
        self.prompts.lock().unwrap().push(request.prompt.to_string());

        let result = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InvocationFailure::Transport("script exhausted".into())));

        if let Some((delay, delayed_calls)) = self.delay {
            if call_index <= delayed_calls {
                tokio::time::sleep(delay).await;
            }
        }

        result
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}
