//! Configuration management.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::llm::gemini::{DEFAULT_API_VERSION, DEFAULT_BASE_URL};
use crate::{Error, Result};

const DEFAULT_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_HISTORY_LIMIT: i64 = 6;
const DEFAULT_TRANSCRIPT_LIMIT: i64 = 20;
const DEFAULT_RETENTION_HOURS: i64 = 24;
const DEFAULT_PORT: u16 = 4000;

const MAX_LIMIT: i64 = 500;
/// Ten years.
const MAX_RETENTION_HOURS: i64 = 24 * 365 * 10;

/// Gemini backend settings.
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key from the environment, trimmed; `None` when absent or blank
    pub api_key: Option<String>,
    /// Secrets Manager ARN holding the key when it is not set directly
    pub secret_arn: Option<String>,
    /// Preferred model, tried before the built-in fallbacks
    pub model: Option<String>,
    pub base_url: String,
    pub api_version: String,
    /// Deadline applied to every model call
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("has_api_key", &self.api_key.is_some())
            .field("secret_arn", &self.secret_arn)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Where transcripts live. Nothing configured means stateless.
#[derive(Clone, Default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub name: String,
    pub secret_arn: Option<String>,
}

impl DatabaseConfig {
    pub fn is_configured(&self) -> bool {
        self.url.is_some() || (self.host.is_some() && self.secret_arn.is_some())
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("has_url", &self.url.is_some())
            .field("host", &self.host)
            .field("name", &self.name)
            .field("secret_arn", &self.secret_arn)
            .finish()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub database: DatabaseConfig,
    /// Messages of history sent with each turn
    pub history_limit: i64,
    /// Messages of transcript sent for a summary
    pub transcript_limit: i64,
    /// Delete a session's messages when it ends
    pub prune_on_end: bool,
    /// Age after which the scheduled pruner deletes messages
    pub retention_hours: i64,
    /// Allowed CORS origins; empty means any
    pub cors_origins: Vec<String>,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let timeout_ms = parse_var(&var, "GEMINI_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;

        Ok(Self {
            gemini: GeminiConfig {
                api_key: var("GEMINI_API_KEY"),
                secret_arn: var("GEMINI_SECRET_ARN"),
                model: var("GEMINI_MODEL"),
                base_url: var("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                api_version: var("GEMINI_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
                timeout: Duration::from_millis(timeout_ms),
            },
            database: DatabaseConfig {
                url: var("DATABASE_URL"),
                host: var("DB_HOST"),
                name: var("DB_NAME").unwrap_or_else(|| "reflectly".to_string()),
                secret_arn: var("DB_SECRET_ARN"),
            },
            history_limit: parse_positive(&var, "HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT, MAX_LIMIT)?,
            transcript_limit: parse_positive(
                &var,
                "TRANSCRIPT_LIMIT",
                DEFAULT_TRANSCRIPT_LIMIT,
                MAX_LIMIT,
            )?,
            prune_on_end: parse_flag(&var, "PRUNE_ON_END", true)?,
            retention_hours: parse_positive(
                &var,
                "TRANSCRIPT_RETENTION_HOURS",
                DEFAULT_RETENTION_HOURS,
                MAX_RETENTION_HOURS,
            )?,
            cors_origins: var("CORS_ORIGIN")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty() && *o != "*")
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            port: parse_var(&var, "PORT", DEFAULT_PORT)?,
        })
    }

    /// Model preference as reported by health checks.
    pub fn model_label(&self) -> &str {
        self.gemini.model.as_deref().unwrap_or("auto")
    }
}

fn parse_var<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("{} has invalid value {:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

/// Parse a count that must fall within `1..=max`.
fn parse_positive<F>(var: &F, key: &str, default: i64, max: i64) -> Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_var(var, key, default)?;
    if !(1..=max).contains(&value) {
        return Err(Error::Config(format!(
            "{} must be between 1 and {}, got {}",
            key, max, value
        )));
    }
    Ok(value)
}

fn parse_flag<F>(var: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key).map(|v| v.to_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes") => Ok(true),
        Some(v) if matches!(v.as_str(), "false" | "0" | "no") => Ok(false),
        Some(v) => Err(Error::Config(format!("{} has invalid value {:?}", key, v))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.gemini.api_key, None);
        assert_eq!(config.gemini.model, None);
        assert_eq!(config.gemini.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.gemini.api_version, "v1beta");
        assert_eq!(config.gemini.timeout, Duration::from_millis(15_000));
        assert!(!config.database.is_configured());
        assert_eq!(config.database.name, "reflectly");
        assert_eq!(config.history_limit, 6);
        assert_eq!(config.transcript_limit, 20);
        assert!(config.prune_on_end);
        assert_eq!(config.retention_hours, 24);
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.port, 4000);
        assert_eq!(config.model_label(), "auto");
    }

    #[test]
    fn test_blank_values_are_absent() {
        let config = config(&[("GEMINI_API_KEY", "   "), ("GEMINI_MODEL", " gemini-2.5-pro ")]).unwrap();
        assert_eq!(config.gemini.api_key, None);
        assert_eq!(config.gemini.model.as_deref(), Some("gemini-2.5-pro"));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("GEMINI_TIMEOUT_MS", "2500"),
            ("DATABASE_URL", "postgres://localhost/reflectly"),
            ("PRUNE_ON_END", "false"),
            ("CORS_ORIGIN", "http://localhost:5173, https://app.example.com"),
            ("PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(config.gemini.timeout, Duration::from_millis(2500));
        assert!(config.database.is_configured());
        assert!(!config.prune_on_end);
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:5173", "https://app.example.com"]
        );
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        let err = config(&[("GEMINI_TIMEOUT_MS", "soon")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(config(&[("PRUNE_ON_END", "maybe")]).is_err());

        for (key, value) in [
            ("TRANSCRIPT_RETENTION_HOURS", "-1"),
            ("TRANSCRIPT_RETENTION_HOURS", "0"),
            ("TRANSCRIPT_RETENTION_HOURS", "9223372036854775"),
            ("HISTORY_LIMIT", "-6"),
            ("TRANSCRIPT_LIMIT", "0"),
            ("TRANSCRIPT_LIMIT", "100000"),
        ] {
            let err = config(&[(key, value)]).unwrap_err();
            assert!(
                matches!(&err, Error::Config(msg) if msg.contains(key)),
                "{}={} gave {:?}",
                key,
                value,
                err
            );
        }

        let config = config(&[("TRANSCRIPT_RETENTION_HOURS", "168"), ("HISTORY_LIMIT", "1")]).unwrap();
        assert_eq!(config.retention_hours, 168);
        assert_eq!(config.history_limit, 1);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = config(&[
            ("GEMINI_API_KEY", "AIza-secret"),
            ("DATABASE_URL", "postgres://u:pw@h/db"),
        ])
        .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("AIza-secret"));
        assert!(!rendered.contains("pw@h"));
    }
}
