//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create tables if not exist
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Alerts (ingested detection events)
CREATE TABLE IF NOT EXISTS alerts (
    id BIGSERIAL PRIMARY KEY,
    timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    src_ip VARCHAR(45) NOT NULL,
    dest_ip VARCHAR(45) NOT NULL,
    signature TEXT NOT NULL,
    severity INT NOT NULL,
    proto VARCHAR(20) NOT NULL,
    rule_score DOUBLE PRECISION NOT NULL,
    ml_score DOUBLE PRECISION NOT NULL DEFAULT 0,
    explanation TEXT
);

-- Analyst feedback (ground truth for KPIs)
CREATE TABLE IF NOT EXISTS feedback (
    id BIGSERIAL PRIMARY KEY,
    alert_id BIGINT NOT NULL REFERENCES alerts(id),
    is_true_positive BOOLEAN NOT NULL,
    timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_alerts_timestamp ON alerts(timestamp);
CREATE INDEX IF NOT EXISTS idx_alerts_src_ip ON alerts(src_ip);
CREATE INDEX IF NOT EXISTS idx_alerts_dedup ON alerts(src_ip, dest_ip, signature, timestamp);
CREATE INDEX IF NOT EXISTS idx_feedback_alert ON feedback(alert_id);
"#;
