//! Aggregate statistics handlers: leaderboard and KPIs
//!
//! Both endpoints favor availability: any failed store query is logged
//! and degraded to its zero default instead of failing the call.

use axum::{extract::{Query, State}, Json};
use serde::Deserialize;

use crate::aggregate::{self, Kpi, RiskEntry, Weights};
use crate::models::{Alert, Feedback};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WeightQuery {
    pub rule: Option<f64>,
    pub ml: Option<f64>,
}

/// Top source IPs by weighted combined risk score
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<WeightQuery>,
) -> Json<Vec<RiskEntry>> {
    let defaults = Weights::default();
    let weights = Weights {
        rule: query.rule.unwrap_or(defaults.rule),
        ml: query.ml.unwrap_or(defaults.ml),
    };

    let stats = Alert::source_stats(&state.pool).await.unwrap_or_else(|e| {
        tracing::warn!("Leaderboard query failed: {}", e);
        Vec::new()
    });

    Json(aggregate::rank(stats, &weights))
}

/// Fleet-wide detection-quality KPIs
pub async fn kpi(State(state): State<AppState>) -> Json<Kpi> {
    let total_alerts = Alert::count(&state.pool).await.unwrap_or_else(|e| {
        tracing::warn!("Alert count query failed: {}", e);
        0
    });

    let (tp, fp) = Feedback::verdict_counts(&state.pool).await.unwrap_or_else(|e| {
        tracing::warn!("Feedback count query failed: {}", e);
        (0, 0)
    });

    let mean_latency_ms = match Feedback::mean_latency_ms(&state.pool).await {
        Ok(Some(ms)) => ms,
        Ok(None) => 0.0,
        Err(e) => {
            tracing::warn!("Latency query failed: {}", e);
            0.0
        }
    };

    Json(aggregate::compute_kpi(total_alerts, tp, fp, mean_latency_ms))
}
