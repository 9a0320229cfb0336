//! Attack simulation stub

use axum::{extract::Path, Json};
use serde_json::json;

/// POST /simulate/:attack_name - echo stub until the lab runner lands
pub async fn run(Path(attack_name): Path<String>) -> Json<serde_json::Value> {
    tracing::info!("Simulation requested: {}", attack_name);

    Json(json!({
        "status": "simulated",
        "attack_name": attack_name,
    }))
}
