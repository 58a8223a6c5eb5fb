use axum::extract::State;
use serde::Deserialize;

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::{Json, JsonOrDefault};
use crate::reconcile::{DriftScanner, SweepReport, VerificationCorrector, VerifyReport};

/// POST /sweepDrift
pub async fn sweep_drift(State(state): State<AppState>) -> Result<Json<SweepReport>> {
    let report = DriftScanner::from_state(&state).sweep().await?;
    Ok(Json(report))
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyRecentRequest {
    /// Look-back in hours (defaults to VERIFY_WINDOW_HOURS)
    #[serde(default)]
    pub hours_back: Option<i64>,
}

/// POST /verifyRecent
pub async fn verify_recent(
    State(state): State<AppState>,
    JsonOrDefault(request): JsonOrDefault<VerifyRecentRequest>,
) -> Result<Json<VerifyReport>> {
    let hours_back = request
        .hours_back
        .unwrap_or(state.reconcile.verify_window_hours);
    let report = VerificationCorrector::from_state(&state)
        .verify(hours_back)
        .await?;
    Ok(Json(report))
}
