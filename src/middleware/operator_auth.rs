use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::db::AppState;
use crate::error::AppError;
use crate::util::extract_bearer_token;

/// Whether the request carries the configured operator key.
///
/// Always false when no operator key is configured.
pub fn is_operator_request(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = state.operator_api_key.as_deref() else {
        return false;
    };
    let Some(token) = extract_bearer_token(headers) else {
        return false;
    };
    token.len() == expected.len() && bool::from(token.as_bytes().ct_eq(expected.as_bytes()))
}

/// Reject requests that do not present the operator key.
pub async fn operator_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !is_operator_request(&state, request.headers()) {
        tracing::debug!(
            "Operator auth failed for {} {}",
            request.method(),
            request.uri().path()
        );
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}
