use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Local entitlement state of an access code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AccessStatus {
    Active,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessCode {
    pub code: String,
    pub order_number: String,
    pub status: AccessStatus,
    pub amount_cents: i64,
    pub created_at: i64,
    /// Set while status is refunded, cleared by rollback
    pub refunded_at: Option<i64>,
    pub refund_order_id: Option<String>,
}

impl AccessCode {
    pub fn is_refunded(&self) -> bool {
        self.status == AccessStatus::Refunded
    }
}

pub const CODE_MIN_LEN: usize = 11;
pub const CODE_MAX_LEN: usize = 12;

/// Normalize user input into the canonical access code form.
///
/// Returns None unless the trimmed, uppercased input is 11-12 ASCII
/// letters or digits.
pub fn normalize_code(input: &str) -> Option<String> {
    let code = input.trim().to_ascii_uppercase();
    let valid_len = (CODE_MIN_LEN..=CODE_MAX_LEN).contains(&code.len());
    if valid_len && code.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(code)
    } else {
        None
    }
}
