//! Transcript and session-metric persistence (Postgres).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::companion::{HistoryMessage, Role};
use crate::Result;

/// Client-reported statistics for a finished session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    #[serde(default)]
    pub turns: i32,
    #[serde(default)]
    pub avg_latency_ms: f64,
    /// Older clients send this as `errors`.
    #[serde(default, alias = "errors")]
    pub error_count: i32,
    #[serde(default)]
    pub mood_delta: Option<f64>,
}

#[derive(Clone)]
pub struct TranscriptStore {
    pool: PgPool,
}

impl TranscriptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn append(&self, session_id: &str, role: Role, content: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO messages (id, session_id, role, content, created_at) VALUES ($1, $2, $3, $4, now())",
        )
        .bind(id)
        .bind(session_id)
        .bind(role.as_str())
        .bind(content)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// The newest `limit` messages of a session, oldest first.
    pub async fn recent_history(&self, session_id: &str, limit: i64) -> Result<Vec<HistoryMessage>> {
        let mut rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT role, content FROM messages WHERE session_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.reverse();
        Ok(rows_to_history(rows))
    }

    /// The first `limit` messages of a session, oldest first.
    pub async fn transcript(&self, session_id: &str, limit: i64) -> Result<Vec<HistoryMessage>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT role, content FROM messages WHERE session_id = $1 ORDER BY created_at ASC LIMIT $2",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows_to_history(rows))
    }

    pub async fn upsert_metrics(&self, session_id: &str, stats: &SessionStats) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO session_metrics (session_id, turns, avg_latency_ms, error_count, mood_delta, ended_at)
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (session_id) DO UPDATE SET
                turns = EXCLUDED.turns,
                avg_latency_ms = EXCLUDED.avg_latency_ms,
                error_count = EXCLUDED.error_count,
                mood_delta = EXCLUDED.mood_delta,
                ended_at = EXCLUDED.ended_at
            "#,
        )
        .bind(session_id)
        .bind(stats.turns)
        .bind(stats.avg_latency_ms)
        .bind(stats.error_count)
        .bind(stats.mood_delta)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Oldest timestamp that survives a retention window. A window reaching
/// past the representable range keeps everything.
pub fn retention_cutoff(now: DateTime<Utc>, retention_hours: i64) -> DateTime<Utc> {
    Duration::try_hours(retention_hours.max(0))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn rows_to_history(rows: Vec<(String, String)>) -> Vec<HistoryMessage> {
    rows.into_iter()
        .filter_map(|(role, content)| match role.parse::<Role>() {
            Ok(role) => Some(HistoryMessage::new(role, content)),
            Err(e) => {
                warn!(error = %e, "Skipping transcript row");
                None
            }
        })
        .collect()
}
