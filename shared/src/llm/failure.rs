//! Invocation failures and the retry classifier.

use thiserror::Error;

/// Maximum characters of cleaned model output kept for diagnostics.
pub const RAW_DIAGNOSTIC_CHARS: usize = 400;

/// Everything that can go wrong while asking a model for a JSON answer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvocationFailure {
    /// The output contained no `{ ... }` span.
    #[error("no JSON object found in model output")]
    ParseNotFound {
        /// Up to 400 characters of the cleaned output.
        raw: String,
    },

    /// The output had a `{ ... }` span that is not valid JSON.
    #[error("invalid JSON in model output: {message}")]
    InvalidJson { message: String },

    /// The deadline expired before the backend answered.
    #[error("model call timed out after {deadline_ms}ms")]
    Timeout { deadline_ms: u64 },

    /// The backend answered with a non-success status.
    #[error("provider rejected request (HTTP {status}): {message}")]
    ProviderRejected {
        status: u16,
        status_text: String,
        message: String,
    },

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// No usable credential was configured.
    #[error("missing API credential")]
    MissingCredential,

    /// Every candidate failed with a retryable failure.
    #[error("all model candidates exhausted; last failure: {last}")]
    ExhaustedCandidates { last: Box<InvocationFailure> },
}

impl InvocationFailure {
    /// Build a `ParseNotFound` from cleaned text, truncating the diagnostic.
    pub fn parse_not_found(cleaned: &str) -> Self {
        InvocationFailure::ParseNotFound {
            raw: cleaned.chars().take(RAW_DIAGNOSTIC_CHARS).collect(),
        }
    }

    /// HTTP status attached by the provider, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            InvocationFailure::ProviderRejected { status, .. } => Some(*status),
            InvocationFailure::ExhaustedCandidates { last } => last.status(),
            _ => None,
        }
    }

    /// Status text attached by the provider, if any.
    pub fn status_text(&self) -> Option<&str> {
        match self {
            InvocationFailure::ProviderRejected { status_text, .. } => Some(status_text),
            InvocationFailure::ExhaustedCandidates { last } => last.status_text(),
            _ => None,
        }
    }

    /// Whether the candidate loop should move on to the next model.
    ///
    /// Model-unavailability text, HTTP 429, HTTP 400 naming an invalid
    /// model/argument, missing JSON and timeouts are retryable. Everything
    /// else stops the loop.
    pub fn is_retryable(&self) -> bool {
        match self {
            InvocationFailure::Timeout { .. } => true,
            InvocationFailure::ParseNotFound { .. } => true,
            InvocationFailure::ProviderRejected {
                status, message, ..
            } => {
                if *status == 429 {
                    return true;
                }
                if *status == 400 && names_invalid_model(message) {
                    return true;
                }
                signals_unavailable_model(message)
            }
            InvocationFailure::Transport(message) => signals_unavailable_model(message),
            InvocationFailure::InvalidJson { .. }
            | InvocationFailure::MissingCredential
            | InvocationFailure::ExhaustedCandidates { .. } => false,
        }
    }
}

/// Free-function form of [`InvocationFailure::is_retryable`].
pub fn is_retryable(failure: &InvocationFailure) -> bool {
    failure.is_retryable()
}

const UNAVAILABLE_SIGNALS: [&str; 3] = [
    "not found",
    "not found for api version",
    "not supported for generatecontent",
];

fn signals_unavailable_model(message: &str) -> bool {
    let message = message.to_lowercase();
    UNAVAILABLE_SIGNALS
        .iter()
        .any(|signal| message.contains(signal))
}

fn names_invalid_model(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("invalid model") || message.contains("invalid argument")
}
