//! Prefixed ID generation for locally generated records.
//!
//! Access codes and order numbers come from the payment flow; everything the
//! reconciliation engine mints itself carries a `ps_` prefix so it can never
//! be mistaken for a gateway trade number.
//!
//! Format: `ps_{entity}_{uuid_simple}` (32 hex chars, no hyphens)

use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    ReconciliationLog,
    /// Local refund reference stamped on a refunded access code
    RefundOrder,
}

impl EntityType {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::ReconciliationLog => "ps_log",
            Self::RefundOrder => "ps_rfd",
        }
    }

    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}
