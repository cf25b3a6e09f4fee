//! HTTP routes for the long-running server.
//!
//! - `POST /api/chat`         - one companion turn
//! - `POST /api/summary`      - end-of-session summary
//! - `POST /api/session/end`  - record metrics, prune transcript
//! - `GET  /api/health`       - liveness report
//! - `GET  /api/diag/gemini`  - model listing and a sample generation
//! - `GET  /api/diag/env`     - configuration report

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tracing::error;

use shared::chat::{env_diag, gemini_diag, health};
use shared::models::{validate_request, ErrorBody};
use shared::{ChatRequest, ChatService, Config, EndSessionRequest, SummaryRequest};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: ChatService,
    pub api_key: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/summary", post(summary))
        .route("/api/session/end", post(end_session))
        .route("/api/health", get(health_check))
        .route("/api/diag/gemini", get(diag_gemini))
        .route("/api/diag/env", get(diag_env))
}

fn error_body(status: StatusCode, body: ErrorBody) -> Response {
    (status, Json(body)).into_response()
}

fn rejection(rejection: JsonRejection) -> Response {
    error_body(
        StatusCode::BAD_REQUEST,
        ErrorBody::new("BAD_REQUEST").with_message(rejection.body_text()),
    )
}

fn failure(e: shared::Error, code: &str) -> Response {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let code = if status == StatusCode::BAD_REQUEST { "BAD_REQUEST" } else { code };
    error_body(status, ErrorBody::new(code).with_message(e.to_string()))
}

async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(e) => return rejection(e),
    };
    if let Err(issues) = validate_request(&request) {
        return error_body(
            StatusCode::BAD_REQUEST,
            ErrorBody::new("BAD_REQUEST").with_issues(issues),
        );
    }

    Json(state.service.chat(&request).await).into_response()
}

async fn summary(
    State(state): State<AppState>,
    body: Result<Json<SummaryRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(e) => return rejection(e),
    };
    if let Err(issues) = validate_request(&request) {
        return error_body(
            StatusCode::BAD_REQUEST,
            ErrorBody::new("BAD_REQUEST").with_issues(issues),
        );
    }

    match state.service.summary(&request).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => {
            error!(error = %e, "summary failed");
            failure(e, "SUMMARY_ERROR")
        }
    }
}

async fn end_session(
    State(state): State<AppState>,
    body: Result<Json<EndSessionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(e) => return rejection(e),
    };
    if let Err(issues) = validate_request(&request) {
        return error_body(
            StatusCode::BAD_REQUEST,
            ErrorBody::new("BAD_REQUEST").with_issues(issues),
        );
    }

    match state.service.end_session(&request).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!(error = %e, "end session failed");
            failure(e, "END_SESSION_ERROR")
        }
    }
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(health(&state.config, state.api_key.is_some(), state.service.store()).await)
}

async fn diag_gemini(State(state): State<AppState>) -> impl IntoResponse {
    Json(gemini_diag(&state.config, state.api_key.as_deref()).await)
}

async fn diag_env(State(state): State<AppState>) -> impl IntoResponse {
    Json(env_diag(&state.config, state.api_key.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use shared::llm::{GenerateRequest, GenerativeBackend, InvocationFailure};
    use shared::Companion;
    use tower::ServiceExt;

    /// Always answers with the same raw text.
    struct FixedBackend(&'static str);

    #[async_trait]
    impl GenerativeBackend for FixedBackend {
        async fn generate(&self, _request: GenerateRequest<'_>) -> Result<String, InvocationFailure> {
            Ok(self.0.to_string())
        }

        fn provider_name(&self) -> &str {
            "fixed"
        }
    }

    fn app(raw: &'static str) -> Router {
        let vars: HashMap<&str, &str> = HashMap::from([("GEMINI_MODEL", "m1")]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        let companion = Companion::with_backend(&config.gemini, Arc::new(FixedBackend(raw)));
        let service = ChatService::new(&config, companion, None);

        router().with_state(AppState {
            config: Arc::new(config),
            service,
            api_key: Some("AIza-test-key".into()),
        })
    }

    async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let app = app(r#"{"paraphrase":"You feel stuck.","tags":["Reflective Mirroring"]}"#);
        let (status, body) = call(
            app,
            Method::POST,
            "/api/chat",
            Some(json!({"sessionId": "abc123", "text": "I feel stuck", "tone": "calm"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["paraphrase"], json!("You feel stuck."));
        assert_eq!(body["actionSteps"], json!([]));
        assert!(body["latencyMs"].is_u64());
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_chat_validation_issues() {
        let (status, body) = call(
            app("{}"),
            Method::POST,
            "/api/chat",
            Some(json!({"sessionId": "abc", "text": "hi"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("BAD_REQUEST"));
        assert_eq!(body["issues"][0]["path"], json!("sessionId"));
    }

    #[tokio::test]
    async fn test_chat_fallback_is_still_200() {
        let (status, body) = call(
            app("not json"),
            Method::POST,
            "/api/chat",
            Some(json!({"sessionId": "abc123", "text": "hello"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], json!(true));
        assert_eq!(body["provider"], json!("fixed"));
        assert_eq!(body["tags"], json!(["Transparency"]));
    }

    #[tokio::test]
    async fn test_summary_errors() {
        let (status, body) = call(app("{}"), Method::POST, "/api/summary", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("BAD_REQUEST"));

        let (status, body) = call(
            app("{ nope"),
            Method::POST,
            "/api/summary",
            Some(json!({"transcript": [{"role": "user", "content": "hi"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], json!("SUMMARY_ERROR"));
    }

    #[tokio::test]
    async fn test_summary_short_session_id_is_rejected() {
        let (status, body) = call(
            app("{}"),
            Method::POST,
            "/api/summary",
            Some(json!({"sessionId": "abc"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("BAD_REQUEST"));
        assert_eq!(body["issues"][0]["path"], json!("sessionId"));
    }

    #[tokio::test]
    async fn test_session_end_is_no_content() {
        let (status, _) = call(
            app("{}"),
            Method::POST,
            "/api/session/end",
            Some(json!({"sessionId": "abc123", "stats": {"turns": 2, "errors": 0}})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_health_and_env() {
        let (status, body) = call(app("{}"), Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model"], json!("m1"));
        assert_eq!(body["database"], json!("disabled"));
        assert_eq!(body["env"]["hasKey"], json!(true));

        let (_, body) = call(app("{}"), Method::GET, "/api/diag/env", None).await;
        assert_eq!(body["keyPrefix"], json!("AIza-t"));
        assert_eq!(body["keyLen"], json!(13));
    }
}
