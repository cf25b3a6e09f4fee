//! Model-call resilience layer.
//!
//! A prompt is sent to each candidate model in order. Every call is guarded
//! by a deadline, the raw output is mined for a JSON object, and failures are
//! classified as "try the next candidate" or fatal.

pub mod backend;
pub mod candidates;
pub mod extract;
pub mod failure;
pub mod gemini;
pub mod guard;
pub mod invoker;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{GenerateRequest, GenerativeBackend};
pub use candidates::{build_candidates, ModelCandidates, FALLBACK_MODELS};
pub use extract::extract_json;
pub use failure::{is_retryable, InvocationFailure};
pub use gemini::GeminiClient;
pub use guard::with_timeout;
pub use invoker::{Answer, ModelInvoker};
