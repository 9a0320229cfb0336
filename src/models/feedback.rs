//! Feedback model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Row};

/// Analyst verdict on an alert. Write-once; read-only input to the
/// KPI computation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub id: i64,
    pub alert_id: i64,
    pub is_true_positive: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFeedback {
    pub alert_id: i64,
    pub is_true_positive: bool,
}

impl Feedback {
    pub async fn create(
        pool: &PgPool,
        alert_id: i64,
        is_true_positive: bool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (alert_id, is_true_positive)
            VALUES ($1, $2)
            RETURNING *
            "#
        )
        .bind(alert_id)
        .bind(is_true_positive)
        .fetch_one(pool)
        .await
    }

    /// (true_positive, false_positive) verdict counts
    pub async fn verdict_counts(pool: &PgPool) -> Result<(i64, i64), sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE is_true_positive) AS tp,
                COUNT(*) FILTER (WHERE NOT is_true_positive) AS fp
            FROM feedback
            "#
        )
        .fetch_one(pool)
        .await?;

        Ok((row.get::<i64, _>("tp"), row.get::<i64, _>("fp")))
    }

    /// Mean feedback-to-alert latency in milliseconds over all feedback
    /// rows with a resolvable alert. `None` when no such pairs exist.
    pub async fn mean_latency_ms(pool: &PgPool) -> Result<Option<f64>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT AVG(EXTRACT(EPOCH FROM (f.timestamp - a.timestamp)))::float8 * 1000 AS mean_ms
            FROM feedback f
            JOIN alerts a ON f.alert_id = a.id
            "#
        )
        .fetch_one(pool)
        .await?;

        Ok(row.get::<Option<f64>, _>("mean_ms"))
    }
}
