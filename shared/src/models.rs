//! Request and response payloads shared by every adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::companion::{FallbackDiagnostics, HistoryMessage, Intent, Tone, TurnResult};
use crate::transcripts::SessionStats;

/// Chat turn request payload.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[validate(length(min = 6, message = "sessionId must be at least 6 characters"))]
    pub session_id: String,
    #[validate(length(min = 1, max = 2000, message = "text must be 1 to 2000 characters"))]
    pub text: String,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub intent: Intent,
}

/// Chat turn response: the turn result plus timing and, on fallback,
/// diagnostic-only fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[serde(flatten)]
    pub result: TurnResult,
    pub latency_ms: u64,
    #[serde(flatten)]
    pub diagnostics: Option<FallbackDiagnostics>,
}

/// Summary request. A stored session is summarized by id; stateless
/// clients send the transcript itself.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    #[serde(default)]
    #[validate(length(min = 6, message = "sessionId must be at least 6 characters"))]
    pub session_id: Option<String>,
    #[serde(default)]
    pub transcript: Option<Vec<HistoryMessage>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionRequest {
    #[validate(length(min = 6, message = "sessionId must be at least 6 characters"))]
    pub session_id: String,
    #[serde(default)]
    pub stats: SessionStats,
}

/// One invalid request field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub path: String,
    pub code: String,
    pub message: String,
}

/// Error body: `{"error": "BAD_REQUEST", "issues": [...]}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            error: code.into(),
            message: None,
            issues: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_issues(mut self, issues: Vec<Issue>) -> Self {
        self.issues = issues;
        self
    }
}

/// Run derive validations and flatten failures into issues.
pub fn validate_request<T: Validate>(request: &T) -> Result<(), Vec<Issue>> {
    request.validate().map_err(|errors| issues_from(&errors))
}

fn issues_from(errors: &ValidationErrors) -> Vec<Issue> {
    let mut issues: Vec<Issue> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let path = camel_case(&field.to_string());
            errs.iter().map(move |e| Issue {
                path: path.clone(),
                code: e.code.to_string(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", path)),
            })
        })
        .collect();
    issues.sort_by(|a, b| a.path.cmp(&b.path));
    issues
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Connected,
    Disabled,
    Unreachable,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvFlags {
    pub has_key: bool,
    pub has_database: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub model: String,
    pub database: DatabaseStatus,
    pub time: DateTime<Utc>,
    pub env: EnvFlags,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SampleGenerate {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Result of probing the Gemini API with the configured key.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiDiag {
    pub ok: bool,
    pub list_ok: bool,
    pub list_count: usize,
    pub names: Vec<String>,
    pub sample_generate: SampleGenerate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvDiag {
    pub has_key: bool,
    pub key_len: usize,
    pub key_prefix: String,
    pub model: String,
    pub cors: Vec<String>,
}

/// Scheduled pruner output.
#[derive(Debug, Clone, Serialize)]
pub struct PruneResponse {
    pub messages_deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_defaults() {
        let request: ChatRequest =
            serde_json::from_value(json!({"sessionId": "abc123", "text": "hi"})).unwrap();
        assert_eq!(request.tone, Tone::Neutral);
        assert_eq!(request.intent, Intent::GoDeep);
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_chat_request_issues() {
        let request: ChatRequest =
            serde_json::from_value(json!({"sessionId": "abc", "text": ""})).unwrap();
        let issues = validate_request(&request).unwrap_err();
        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["sessionId", "text"]);
        assert_eq!(issues[0].code, "length");
    }

    #[test]
    fn test_text_length_counts_characters() {
        let request = ChatRequest {
            session_id: "abcdef".into(),
            text: "é".repeat(2000),
            tone: Tone::Calm,
            intent: Intent::Solve,
        };
        assert!(validate_request(&request).is_ok());

        let too_long = ChatRequest {
            text: "a".repeat(2001),
            ..request
        };
        assert!(validate_request(&too_long).is_err());
    }

    #[test]
    fn test_summary_request_session_id() {
        let short: SummaryRequest = serde_json::from_value(json!({"sessionId": "abc"})).unwrap();
        let issues = validate_request(&short).unwrap_err();
        assert_eq!(issues[0].path, "sessionId");

        let stateless: SummaryRequest = serde_json::from_value(
            json!({"transcript": [{"role": "user", "content": "hi"}]}),
        )
        .unwrap();
        assert!(validate_request(&stateless).is_ok());
        assert!(validate_request(&SummaryRequest {
            session_id: Some("abc123".into()),
            transcript: None,
        })
        .is_ok());
    }

    #[test]
    fn test_unknown_tone_is_rejected() {
        let parsed = serde_json::from_value::<ChatRequest>(
            json!({"sessionId": "abc123", "text": "hi", "tone": "furious"}),
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_chat_response_flattens() {
        let response = ChatResponse {
            result: TurnResult {
                paraphrase: "p".into(),
                ..Default::default()
            },
            latency_ms: 42,
            diagnostics: None,
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"paraphrase": "p", "actionSteps": [], "tags": [], "latencyMs": 42})
        );
    }

    #[test]
    fn test_end_session_accepts_legacy_errors() {
        let request: EndSessionRequest = serde_json::from_value(json!({
            "sessionId": "abc123",
            "stats": {"turns": 3, "avgLatencyMs": 900.0, "errors": 2}
        }))
        .unwrap();
        assert_eq!(request.stats.error_count, 2);
    }

    #[test]
    fn test_health_wire_shape() {
        let health = HealthResponse {
            ok: true,
            model: "auto".into(),
            database: DatabaseStatus::Disabled,
            time: Utc::now(),
            env: EnvFlags {
                has_key: true,
                has_database: false,
            },
        };
        let value = serde_json::to_value(&health).unwrap();
        assert_eq!(value["database"], json!("disabled"));
        assert_eq!(value["env"], json!({"hasKey": true, "hasDatabase": false}));
    }
}
