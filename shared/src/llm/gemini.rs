//! Google Gemini backend (`generateContent` over HTTPS).
//!
//! Auth is an API key passed as the `key` query parameter.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::backend::{GenerateRequest, GenerativeBackend};
use super::failure::InvocationFailure;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_API_VERSION: &str = "v1beta";

const PROVIDER: &str = "gemini";
const TEMPERATURE: f32 = 0.7;

/// HTTP client for the Gemini API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    api_version: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client. Fails fast when the key is absent or blank.
    pub fn new(
        api_key: &str,
        base_url: &str,
        api_version: &str,
    ) -> Result<Self, InvocationFailure> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(InvocationFailure::MissingCredential);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.trim_matches('/').to_string(),
        })
    }

    /// Create a client against the public endpoint.
    pub fn with_key(api_key: &str) -> Result<Self, InvocationFailure> {
        Self::new(api_key, DEFAULT_BASE_URL, DEFAULT_API_VERSION)
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/{}/models/{}:generateContent?key={}",
            self.base_url,
            self.api_version,
            model,
            urlencoding::encode(&self.api_key)
        )
    }

    fn models_url(&self) -> String {
        format!(
            "{}/{}/models?key={}",
            self.base_url,
            self.api_version,
            urlencoding::encode(&self.api_key)
        )
    }

    async fn post_generate(&self, model: &str, body: &Value) -> Result<String, InvocationFailure> {
        let url = self.generate_url(model);
        debug!(provider = PROVIDER, url = %redact_url_key(&url), "gemini generate request");

        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| InvocationFailure::Transport(redact_url_key(&e.to_string())))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| InvocationFailure::Transport(redact_url_key(&e.to_string())))?;

        if !status.is_success() {
            return Err(parse_error_body(
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                &text,
            ));
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            InvocationFailure::Transport(format!("unreadable generateContent response: {}", e))
        })?;

        Ok(parse_generate_response(&body))
    }

    /// One plain-text generation, without JSON mode or a schema hint.
    pub async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, InvocationFailure> {
        self.post_generate(model, &build_plain_body(prompt)).await
    }

    /// List the model names visible to this key.
    pub async fn list_models(&self) -> Result<Vec<String>, InvocationFailure> {
        let resp = self
            .http
            .get(self.models_url())
            .send()
            .await
            .map_err(|e| InvocationFailure::Transport(redact_url_key(&e.to_string())))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| InvocationFailure::Transport(redact_url_key(&e.to_string())))?;

        if !status.is_success() {
            return Err(parse_error_body(
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                &text,
            ));
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| InvocationFailure::Transport(format!("unreadable models listing: {}", e)))?;

        Ok(parse_model_names(&body))
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<String, InvocationFailure> {
        let body = build_body(request.prompt, request.response_schema);

        match self.post_generate(request.model, &body).await {
            Err(failure) if request.response_schema.is_some() && rejects_schema_hint(&failure) => {
                warn!(
                    provider = PROVIDER,
                    model = request.model,
                    error = %failure,
                    "response schema hint rejected, retrying without it"
                );
                self.post_generate(request.model, &build_body(request.prompt, None))
                    .await
            }
            other => other,
        }
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }
}

/// Build the `generateContent` request body.
pub fn build_body(prompt: &str, response_schema: Option<&Value>) -> Value {
    let mut generation_config = json!({
        "responseMimeType": "application/json",
        "temperature": TEMPERATURE,
    });
    if let Some(schema) = response_schema {
        generation_config["responseSchema"] = schema.clone();
    }

    json!({
        "contents": user_contents(prompt),
        "generationConfig": generation_config,
    })
}

/// Build a request body for free-form text output.
pub fn build_plain_body(prompt: &str) -> Value {
    json!({
        "contents": user_contents(prompt),
        "generationConfig": { "temperature": TEMPERATURE },
    })
}

fn user_contents(prompt: &str) -> Value {
    json!([{
        "role": "user",
        "parts": [{ "text": prompt }],
    }])
}

/// Concatenate the text parts of the first candidate.
///
/// A response without candidates (e.g. a blocked prompt) yields an empty
/// string, which the extractor reports as missing JSON.
pub fn parse_generate_response(body: &Value) -> String {
    let parts = body
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());

    let mut text = String::new();
    if let Some(parts) = parts {
        for part in parts {
            if let Some(t) = part.get("text").and_then(|v| v.as_str()) {
                text.push_str(t);
            }
        }
    }
    text
}

/// Map a non-success response into [`InvocationFailure::ProviderRejected`].
///
/// Gemini errors look like `{"error":{"code":404,"message":"...","status":"NOT_FOUND"}}`;
/// anything else keeps the raw body as the message.
pub fn parse_error_body(status: u16, reason: &str, body: &str) -> InvocationFailure {
    let error = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").cloned());

    let message = error
        .as_ref()
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());

    let status_text = error
        .as_ref()
        .and_then(|e| e.get("status"))
        .and_then(|s| s.as_str())
        .unwrap_or(reason)
        .to_string();

    InvocationFailure::ProviderRejected {
        status,
        status_text,
        message,
    }
}

/// Extract `models[].name` from a models listing.
pub fn parse_model_names(body: &Value) -> Vec<String> {
    body.get("models")
        .and_then(|m| m.as_array())
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn rejects_schema_hint(failure: &InvocationFailure) -> bool {
    match failure {
        InvocationFailure::ProviderRejected {
            status: 400,
            message,
            ..
        } => {
            let message = message.to_lowercase();
            message.contains("response_schema")
                || message.contains("responseschema")
                || message.contains("additionalproperties")
        }
        _ => false,
    }
}

/// Redact the API key from a URL (or an error message embedding one).
pub fn redact_url_key(url: &str) -> String {
    if let Some(idx) = url.find("key=") {
        let prefix = &url[..idx + 4];
        let rest = &url[idx + 4..];
        let end = rest
            .find(|c: char| c == '&' || c == ')' || c.is_whitespace())
            .unwrap_or(rest.len());
        format!("{prefix}[REDACTED]{}", &rest[end..])
    } else {
        url.to_string()
    }
}
