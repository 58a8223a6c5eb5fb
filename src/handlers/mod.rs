mod operators;
mod refund;

pub use operators::*;
pub use refund::*;

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::AppState;
use crate::middleware::operator_auth;
use crate::rate_limit;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// All HTTP routes. `refund_rpm = 0` leaves `/refund` unthrottled.
pub fn router(state: AppState, refund_rpm: u32) -> Router<AppState> {
    let mut refund = Router::new().route("/refund", post(refund_access_code));
    if let Some(layer) = rate_limit::refund_layer(refund_rpm) {
        refund = refund.layer(layer);
    }

    let operators = Router::new()
        .route("/sweepDrift", post(sweep_drift))
        .route("/verifyRecent", post(verify_recent))
        .layer(middleware::from_fn_with_state(state, operator_auth));

    Router::new()
        .route("/health", get(health))
        .merge(refund)
        .merge(operators)
}
