//! Payment gateway access.
//!
//! The reconciliation engine only sees the [`Gateway`] trait. Results never
//! carry a Rust error: a failed call comes back as a value with `error` set and
//! the destructive flag (`is_refunded` / `accepted`) forced to false.

mod client;
pub mod sign;

pub use client::*;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum GatewayError {
    #[error("Gateway timed out")]
    Timeout,

    #[error("Gateway unreachable: {0}")]
    Unreachable(String),

    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    #[error("Gateway rejected request: {0}")]
    Rejected(String),

    #[error("Signature or transport error: {0}")]
    SignatureOrTransport(String),
}

/// Outcome of a refund-status query.
#[derive(Debug, Clone, Serialize)]
pub struct StatusCheck {
    pub is_refunded: bool,
    /// Parsed JSON body, or the raw text wrapped in a JSON string
    pub raw: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<GatewayError>,
}

impl StatusCheck {
    pub fn refunded(raw: serde_json::Value) -> Self {
        Self {
            is_refunded: true,
            raw,
            error: None,
        }
    }

    pub fn not_refunded(raw: serde_json::Value) -> Self {
        Self {
            is_refunded: false,
            raw,
            error: None,
        }
    }

    /// A failed query never reports "refunded".
    pub fn failed(error: GatewayError, raw: serde_json::Value) -> Self {
        Self {
            is_refunded: false,
            raw,
            error: Some(error),
        }
    }

    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Outcome of a refund request.
#[derive(Debug, Clone, Serialize)]
pub struct RefundAttempt {
    pub accepted: bool,
    pub raw: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<GatewayError>,
}

impl RefundAttempt {
    pub fn accepted(raw: serde_json::Value) -> Self {
        Self {
            accepted: true,
            raw,
            error: None,
        }
    }

    pub fn failed(error: GatewayError, raw: serde_json::Value) -> Self {
        Self {
            accepted: false,
            raw,
            error: Some(error),
        }
    }

    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// The external payment gateway as seen by the reconciliation engine.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Ask the gateway whether `order_number` has been refunded.
    async fn query_status(&self, order_number: &str) -> StatusCheck;

    /// Ask the gateway to refund `amount_cents` on `order_number`.
    async fn issue_refund(&self, order_number: &str, amount_cents: i64) -> RefundAttempt;
}
