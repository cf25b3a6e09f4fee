//! Shared library for the Reflectly listening companion.
//!
//! Holds the model-call resilience layer, the turn and summary
//! orchestrators, and the persistence and HTTP glue reused by the Lambda
//! functions and the standalone server.

pub mod chat;
pub mod companion;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod llm;
pub mod models;
pub mod secrets;
pub mod transcripts;

pub use chat::ChatService;
pub use companion::{Companion, SummaryResult, TurnResult};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{ChatRequest, ChatResponse, EndSessionRequest, SummaryRequest};
pub use secrets::{get_database_credentials, get_secret, resolve_api_key, DatabaseCredentials};
pub use transcripts::{SessionStats, TranscriptStore};

