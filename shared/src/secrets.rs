//! AWS Secrets Manager integration.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;

use crate::config::GeminiConfig;
use crate::{Error, Result};

/// Cached secrets with lazy initialization.
static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Database credentials from Secrets Manager.
#[derive(Debug, Deserialize)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
}

/// Build a Secrets Manager client from the default AWS config chain.
pub async fn secrets_client() -> SecretsClient {
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    SecretsClient::new(&config)
}

/// Get a secret value from Secrets Manager with caching.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    {
        let cache = get_cache().read().await;
        if let Some(value) = cache.get(secret_arn) {
            return Ok(value.clone());
        }
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    {
        let mut cache = get_cache().write().await;
        cache.insert(secret_arn.to_string(), secret_string.clone());
    }

    Ok(secret_string)
}

/// Get database credentials from Secrets Manager.
pub async fn get_database_credentials(
    client: &SecretsClient,
    secret_arn: &str,
) -> Result<DatabaseCredentials> {
    let secret_string = get_secret(client, secret_arn).await?;

    serde_json::from_str(&secret_string)
        .map_err(|e| Error::Aws(format!("Failed to parse database credentials: {}", e)))
}

/// Resolve the Gemini API key.
///
/// The environment value wins; otherwise the secret named by
/// `GEMINI_SECRET_ARN` is read. `Ok(None)` means no key is configured.
pub async fn resolve_api_key(config: &GeminiConfig) -> Result<Option<String>> {
    if let Some(key) = &config.api_key {
        return Ok(Some(key.clone()));
    }
    let Some(secret_arn) = &config.secret_arn else {
        return Ok(None);
    };

    let client = secrets_client().await;
    let raw = get_secret(&client, secret_arn).await?;
    Ok(parse_api_key_secret(&raw))
}

/// A key secret is either the bare key or a JSON object holding it.
pub fn parse_api_key_secret(raw: &str) -> Option<String> {
    let key = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => ["GEMINI_API_KEY", "apiKey", "api_key"]
            .iter()
            .find_map(|name| fields.get(*name).and_then(|v| v.as_str()))
            .unwrap_or_default()
            .to_string(),
        _ => raw.to_string(),
    };

    let key = key.trim();
    (!key.is_empty()).then(|| key.to_string())
}

/// Clear the secrets cache (useful for testing or credential rotation).
pub async fn clear_cache() {
    let mut cache = get_cache().write().await;
    cache.clear();
}
