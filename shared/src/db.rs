//! Database connection management.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::secrets::{get_database_credentials, secrets_client};
use crate::{Error, Result};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS messages (
        id UUID PRIMARY KEY,
        session_id TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('user', 'ai')),
        content TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    "CREATE INDEX IF NOT EXISTS messages_session_created_idx ON messages (session_id, created_at)",
    r#"CREATE TABLE IF NOT EXISTS session_metrics (
        session_id TEXT PRIMARY KEY,
        turns INTEGER NOT NULL DEFAULT 0,
        avg_latency_ms DOUBLE PRECISION NOT NULL DEFAULT 0,
        error_count INTEGER NOT NULL DEFAULT 0,
        mood_delta DOUBLE PRECISION,
        ended_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
];

/// Resolve the connection URL: `DATABASE_URL` directly, or host plus
/// Secrets Manager credentials. `None` means no database is configured.
pub async fn database_url(config: &DatabaseConfig) -> Result<Option<String>> {
    if let Some(url) = &config.url {
        return Ok(Some(url.clone()));
    }
    let (Some(host), Some(secret_arn)) = (&config.host, &config.secret_arn) else {
        return Ok(None);
    };

    let client = secrets_client().await;
    let creds = get_database_credentials(&client, secret_arn).await?;

    Ok(Some(format!(
        "postgres://{}:{}@{}:{}/{}",
        urlencoding::encode(&creds.username),
        urlencoding::encode(&creds.password),
        creds.host.as_deref().unwrap_or(host),
        creds.port.unwrap_or(5432),
        creds.dbname.as_deref().unwrap_or(&config.name)
    )))
}

/// Create a database connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    Ok(pool)
}

/// Connect when a database is configured; `Ok(None)` runs stateless.
pub async fn connect(config: &DatabaseConfig) -> Result<Option<PgPool>> {
    match database_url(config).await? {
        Some(url) => {
            let pool = create_pool(&url).await?;
            ensure_schema(&pool).await?;
            Ok(Some(pool))
        }
        None => {
            info!("No database configured, running stateless");
            Ok(None)
        }
    }
}

/// Create the transcript tables if they do not exist.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(*statement).execute(pool).await?;
    }
    Ok(())
}

/// Cheap liveness probe used by health checks.
pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_url_takes_precedence() {
        let config = DatabaseConfig {
            url: Some("postgres://localhost/reflectly".into()),
            host: Some("ignored".into()),
            name: "reflectly".into(),
            secret_arn: Some("arn".into()),
        };
        assert_eq!(
            database_url(&config).await.unwrap().as_deref(),
            Some("postgres://localhost/reflectly")
        );
    }

    #[tokio::test]
    async fn test_unconfigured_is_stateless() {
        let config = DatabaseConfig {
            host: Some("db.internal".into()),
            ..Default::default()
        };
        assert_eq!(database_url(&config).await.unwrap(), None);
        assert!(connect(&config).await.unwrap().is_none());
    }

    #[test]
    fn test_schema_is_idempotent() {
        assert!(SCHEMA.iter().all(|s| s.contains("IF NOT EXISTS")));
    }
}
