//! The seam between the invoker and a concrete generation API.

use async_trait::async_trait;
use serde_json::Value;

use super::failure::InvocationFailure;

/// One generation request for one candidate model.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    /// Advisory structured-output hint; backends may ignore it.
    pub response_schema: Option<&'a Value>,
}

/// A text-generation backend.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Issue exactly one generation call and return the raw text output.
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<String, InvocationFailure>;

    /// Short provider name used in logs and diagnostics.
    fn provider_name(&self) -> &str;
}
