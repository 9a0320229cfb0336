//! Alert model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::aggregate::SourceStat;

/// One ingested detection event.
///
/// `rule_score` is set at creation and never changes. `ml_score` and
/// `explanation` start at 0/NULL and transition at most once, either
/// copied from a duplicate at creation or written by the enrichment
/// worker.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Alert {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub src_ip: String,
    pub dest_ip: String,
    pub signature: String,
    pub severity: i32,
    pub proto: String,
    pub rule_score: f64,
    pub ml_score: f64,
    pub explanation: Option<String>,
}

/// Ingestion payload
#[derive(Debug, Deserialize, Validate)]
pub struct IngestAlert {
    #[validate(length(min = 1, message = "src_ip is required"))]
    pub src_ip: String,
    #[validate(length(min = 1, message = "dest_ip is required"))]
    pub dest_ip: String,
    #[validate(length(min = 1, message = "signature is required"))]
    pub signature: String,
    pub severity: i32,
    #[validate(length(min = 1, message = "proto is required"))]
    pub proto: String,
}

impl Alert {
    /// Persist a new alert. Enrichment fields are pre-filled when a
    /// duplicate supplied them, default (0 / NULL) otherwise.
    pub async fn create(
        pool: &PgPool,
        data: &IngestAlert,
        rule_score: f64,
        ml_score: f64,
        explanation: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Alert>(
            r#"
            INSERT INTO alerts (src_ip, dest_ip, signature, severity, proto, rule_score, ml_score, explanation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#
        )
        .bind(&data.src_ip)
        .bind(&data.dest_ip)
        .bind(&data.signature)
        .bind(data.severity)
        .bind(&data.proto)
        .bind(rule_score)
        .bind(ml_score)
        .bind(explanation)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Alert>("SELECT * FROM alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Most recent alerts first, keyed by id (monotonic)
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Alert>(
            "SELECT * FROM alerts ORDER BY id DESC LIMIT $1"
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Scan the trailing dedup window for an equivalent alert.
    ///
    /// Equivalence is an exact match on source/destination IP,
    /// signature, severity, protocol and rule score; the most recent
    /// match wins. The rule score comparison is exact because the rule
    /// scorer is deterministic.
    pub async fn find_duplicate(
        pool: &PgPool,
        data: &IngestAlert,
        rule_score: f64,
        window_minutes: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let cutoff = Utc::now() - Duration::minutes(window_minutes);

        sqlx::query_as::<_, Alert>(
            r#"
            SELECT * FROM alerts
            WHERE timestamp >= $1
              AND src_ip = $2
              AND dest_ip = $3
              AND signature = $4
              AND severity = $5
              AND proto = $6
              AND rule_score = $7
            ORDER BY id DESC
            LIMIT 1
            "#
        )
        .bind(cutoff)
        .bind(&data.src_ip)
        .bind(&data.dest_ip)
        .bind(&data.signature)
        .bind(data.severity)
        .bind(&data.proto)
        .bind(rule_score)
        .fetch_optional(pool)
        .await
    }

    /// Write the enrichment result to an existing row. Returns `None`
    /// when the row no longer exists.
    pub async fn update_enrichment(
        pool: &PgPool,
        id: i64,
        ml_score: f64,
        explanation: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Alert>(
            r#"
            UPDATE alerts
            SET ml_score = $2, explanation = $3
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(id)
        .bind(ml_score)
        .bind(explanation)
        .fetch_optional(pool)
        .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM alerts")
            .fetch_one(pool)
            .await
    }

    /// Per-source-IP score averages feeding the leaderboard
    pub async fn source_stats(pool: &PgPool) -> Result<Vec<SourceStat>, sqlx::Error> {
        sqlx::query_as::<_, SourceStat>(
            r#"
            SELECT src_ip,
                   AVG(rule_score) AS avg_rule_score,
                   AVG(ml_score) AS avg_ml_score,
                   COUNT(id) AS count
            FROM alerts
            GROUP BY src_ip
            "#
        )
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> IngestAlert {
        IngestAlert {
            src_ip: "192.168.1.20".to_string(),
            dest_ip: "10.0.0.5".to_string(),
            signature: "ET SCAN Nmap TCP".to_string(),
            severity: 3,
            proto: "TCP".to_string(),
        }
    }

    #[test]
    fn test_valid_payload_passes() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn test_empty_fields_rejected() {
        let mut p = payload();
        p.src_ip = String::new();
        assert!(p.validate().is_err());

        let mut p = payload();
        p.signature = String::new();
        assert!(p.validate().is_err());

        let mut p = payload();
        p.proto = String::new();
        assert!(p.validate().is_err());
    }
}
