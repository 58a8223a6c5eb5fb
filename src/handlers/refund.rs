use axum::{extract::State, http::HeaderMap};
use serde::Deserialize;

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::Json;
use crate::middleware::is_operator_request;
use crate::models::Actor;
use crate::reconcile::{RefundOrchestrator, RefundOutcome};

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub access_code: String,
}

/// POST /refund
///
/// Open to customers; a valid operator key records the operator as the
/// initiator instead.
pub async fn refund_access_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RefundRequest>,
) -> Result<Json<RefundOutcome>> {
    let initiator = if is_operator_request(&state, &headers) {
        Actor::Operator
    } else {
        Actor::Customer
    };

    let outcome = RefundOrchestrator::from_state(&state)
        .refund(&request.access_code, initiator)
        .await?;

    Ok(Json(outcome))
}
