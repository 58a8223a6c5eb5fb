use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use super::AccessStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationType {
    ManualRefund,
    DriftFix,
    Rollback,
}

impl OperationType {
    /// Status the access code holds after this operation.
    pub fn resulting_status(self) -> AccessStatus {
        match self {
            Self::ManualRefund | Self::DriftFix => AccessStatus::Refunded,
            Self::Rollback => AccessStatus::Active,
        }
    }
}

/// Who performed a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Actor {
    Customer,
    Operator,
    DriftScanner,
    VerificationCorrector,
}

/// Append-only audit record of one access code status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationLog {
    pub id: String,
    pub operation_type: OperationType,
    pub access_code: String,
    pub order_number: String,
    /// Opaque gateway payload captured at the time of the change
    pub gateway_response: Option<serde_json::Value>,
    pub performed_by: Actor,
    pub performed_at: i64,
}
