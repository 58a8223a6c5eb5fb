use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// User-facing error messages, kept in one place so handlers and tests agree.
pub mod msg {
    pub const CODE_NOT_FOUND: &str = "Access code not found";
    pub const ORDER_NOT_FOUND: &str = "Order not found for access code";
    pub const ORDER_NOT_PAID: &str = "Order has not been paid";
    pub const INVALID_ACCESS_CODE: &str = "Access code must be 11-12 uppercase letters or digits";
    pub const INVALID_HOURS_BACK: &str = "hours_back must be between 1 and 720";
    pub const DUPLICATE_ORDER: &str = "Order number already exists";
    pub const DUPLICATE_CODE: &str = "Access code already exists";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Access code not found")]
    CodeNotFound,

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order not paid: {0}")]
    OrderNotPaid(String),

    #[error("Refund window expired: paid {days_since_paid} days ago (limit {window_days})")]
    RefundWindowExpired { days_since_paid: i64, window_days: i64 },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::CodeNotFound => (
                StatusCode::NOT_FOUND,
                "Not found",
                Some(msg::CODE_NOT_FOUND.to_string()),
            ),
            AppError::OrderNotFound(_) => (
                StatusCode::NOT_FOUND,
                "Not found",
                Some(msg::ORDER_NOT_FOUND.to_string()),
            ),
            AppError::OrderNotPaid(_) => (
                StatusCode::CONFLICT,
                "Conflict",
                Some(msg::ORDER_NOT_PAID.to_string()),
            ),
            AppError::RefundWindowExpired { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Refund window expired",
                Some(self.to_string()),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone())),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized", None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", Some(msg.clone())),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON", Some(e.to_string()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Converts `Option<T>` lookups into `AppError` rejections.
pub trait OptionExt<T> {
    fn or_code_not_found(self) -> Result<T>;
    fn or_order_not_found(self, order_number: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_code_not_found(self) -> Result<T> {
        self.ok_or(AppError::CodeNotFound)
    }

    fn or_order_not_found(self, order_number: &str) -> Result<T> {
        self.ok_or_else(|| AppError::OrderNotFound(order_number.to_string()))
    }
}
