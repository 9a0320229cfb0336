//! Feedback handler

use axum::{extract::State, Json};

use crate::{AppState, AppError, AppResult};
use crate::models::{Alert, CreateFeedback, Feedback};

/// Record an analyst verdict. This is the one strict path: the
/// referenced alert must exist, because feedback is the ground truth
/// behind the KPI summary.
pub async fn submit(
    State(state): State<AppState>,
    Json(req): Json<CreateFeedback>,
) -> AppResult<Json<Feedback>> {
    Alert::find_by_id(&state.pool, req.alert_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Alert not found".to_string()))?;

    let feedback = Feedback::create(&state.pool, req.alert_id, req.is_true_positive).await?;

    tracing::debug!(
        "Feedback {} recorded for alert {} (tp={})",
        feedback.id,
        feedback.alert_id,
        feedback.is_true_positive
    );

    Ok(Json(feedback))
}
