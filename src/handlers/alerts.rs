//! Alert handlers: ingestion and recent listing

use axum::{extract::{Query, State}, Json};
use serde::Deserialize;
use validator::Validate;

use crate::{AppState, AppResult};
use crate::events::DashboardEvent;
use crate::models::{Alert, IngestAlert};
use crate::scoring;

/// Ingest one detection event.
///
/// The response is fully formed at persist time and never waits on the
/// oracle: fresh alerts report `ml_score = 0`, duplicates report the
/// enrichment copied from their match.
pub async fn ingest(
    State(state): State<AppState>,
    Json(payload): Json<IngestAlert>,
) -> AppResult<Json<Alert>> {
    payload.validate()?;

    let rule_score = scoring::score_severity(payload.severity);

    // Fail-open: a broken dedup scan must not block ingestion
    let duplicate = match Alert::find_duplicate(
        &state.pool,
        &payload,
        rule_score,
        state.config.dedup_window_minutes,
    )
    .await
    {
        Ok(dup) => dup,
        Err(e) => {
            tracing::warn!("Dedup scan failed, treating alert as novel: {}", e);
            None
        }
    };

    let (ml_score, explanation) = match &duplicate {
        Some(prior) => (prior.ml_score, prior.explanation.as_deref()),
        None => (0.0, None),
    };

    let alert = Alert::create(&state.pool, &payload, rule_score, ml_score, explanation).await?;

    state.events.broadcast_lossy(DashboardEvent::NewAlert {
        alert: alert.clone(),
    });

    match duplicate {
        Some(prior) => {
            tracing::debug!("Alert {} reuses enrichment from duplicate {}", alert.id, prior.id)
        }
        None => state.enrichment.schedule(alert.clone()),
    }

    Ok(Json(alert))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// List recent alerts, newest first. A store failure degrades to an
/// empty list rather than an error.
pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<Alert>> {
    let limit = query.limit.unwrap_or(50);

    let alerts = Alert::list_recent(&state.pool, limit)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to list recent alerts: {}", e);
            Vec::new()
        });

    Json(alerts)
}
