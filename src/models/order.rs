use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use super::AccessCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

/// Mirrors the access code status on the order for billing audits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RefundStatus {
    None,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Shared with the gateway as `out_trade_no`
    pub order_number: String,
    pub payment_status: PaymentStatus,
    pub refund_status: RefundStatus,
    pub amount_cents: i64,
    pub paid_at: i64,
    pub created_at: i64,
    pub refunded_at: Option<i64>,
}

/// Input written by the payment-success callback: one paid order and its code.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPaidOrder {
    pub order_number: String,
    pub amount_cents: i64,
    pub paid_at: i64,
    /// Pre-issued code; generated when absent
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaidOrder {
    pub order: Order,
    pub access_code: AccessCode,
}
