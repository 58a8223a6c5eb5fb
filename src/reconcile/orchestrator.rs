use std::sync::Arc;

use serde::Serialize;

use crate::db::{queries, AppState, DbPool};
use crate::error::{AppError, OptionExt, Result};
use crate::gateway::Gateway;
use crate::id::EntityType;
use crate::models::{normalize_code, Actor, OperationType, PaymentStatus};

const SECONDS_PER_DAY: i64 = 86_400;

/// What a refund request ended up doing.
#[derive(Debug, Clone, Serialize)]
pub struct RefundReceipt {
    pub access_code: String,
    pub order_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<i64>,
    /// Whether the gateway accepted the refund call. Local state is updated
    /// either way; the verification pass settles disagreements.
    pub gateway_confirmed: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefundOutcome {
    Refunded(RefundReceipt),
    AlreadyRefunded(RefundReceipt),
}

impl RefundOutcome {
    pub fn receipt(&self) -> &RefundReceipt {
        match self {
            Self::Refunded(r) | Self::AlreadyRefunded(r) => r,
        }
    }

    pub fn is_already_refunded(&self) -> bool {
        matches!(self, Self::AlreadyRefunded(_))
    }
}

/// Processes a single refund request for an access code.
#[derive(Clone)]
pub struct RefundOrchestrator {
    db: DbPool,
    gateway: Arc<dyn Gateway>,
    refund_window_days: i64,
}

impl RefundOrchestrator {
    pub fn new(db: DbPool, gateway: Arc<dyn Gateway>, refund_window_days: i64) -> Self {
        Self {
            db,
            gateway,
            refund_window_days,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.db.clone(),
            state.gateway.clone(),
            state.reconcile.refund_window_days,
        )
    }

    pub async fn refund(&self, access_code: &str, initiator: Actor) -> Result<RefundOutcome> {
        let code = normalize_code(access_code).ok_or(AppError::CodeNotFound)?;

        // Validation reads happen on a connection released before the gateway call
        let (access, order) = {
            let conn = self.db.get()?;
            let access = queries::get_access_code(&conn, &code)?.or_code_not_found()?;
            if access.is_refunded() {
                return Ok(already_refunded(
                    access.code,
                    access.order_number,
                    access.refund_order_id,
                    access.refunded_at,
                ));
            }
            let order = queries::get_order(&conn, &access.order_number)?
                .or_order_not_found(&access.order_number)?;
            (access, order)
        };

        if order.payment_status != PaymentStatus::Paid {
            return Err(AppError::OrderNotPaid(order.order_number));
        }

        let elapsed = queries::now() - order.paid_at;
        if elapsed > self.refund_window_days.saturating_mul(SECONDS_PER_DAY) {
            return Err(AppError::RefundWindowExpired {
                days_since_paid: (elapsed + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY,
                window_days: self.refund_window_days,
            });
        }

        let attempt = self
            .gateway
            .issue_refund(&order.order_number, order.amount_cents)
            .await;
        let payload = attempt.to_payload();

        let refund_order_id = EntityType::RefundOrder.gen_id();
        let refunded_at = queries::now();
        let mut conn = self.db.get()?;
        let log = queries::mark_refunded_atomic(
            &mut conn,
            &queries::RefundTransition {
                code: &access.code,
                operation: OperationType::ManualRefund,
                performed_by: initiator,
                refunded_at,
                refund_order_id: &refund_order_id,
                gateway_response: Some(&payload),
            },
        )?;

        if log.is_none() {
            // Another writer refunded the code while the gateway call was in flight
            let current = queries::get_access_code(&conn, &access.code)?.or_code_not_found()?;
            tracing::info!(
                "Refund for {} lost race to a concurrent writer; leaving existing refund in place",
                access.code
            );
            return Ok(already_refunded(
                current.code,
                current.order_number,
                current.refund_order_id,
                current.refunded_at,
            ));
        }

        let message = if attempt.accepted {
            tracing::info!(
                "Refunded access code {} (order {}) by {}: gateway confirmed",
                access.code,
                order.order_number,
                initiator.as_ref()
            );
            "Refund processed: gateway confirmed".to_string()
        } else {
            tracing::warn!(
                "Refunded access code {} (order {}) by {}: gateway pending ({})",
                access.code,
                order.order_number,
                initiator.as_ref(),
                attempt
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "not accepted".into())
            );
            "Refund processed: local state updated, gateway confirmation pending".to_string()
        };

        Ok(RefundOutcome::Refunded(RefundReceipt {
            access_code: access.code,
            order_number: order.order_number,
            refund_order_id: Some(refund_order_id),
            refunded_at: Some(refunded_at),
            gateway_confirmed: attempt.accepted,
            message,
        }))
    }
}

fn already_refunded(
    access_code: String,
    order_number: String,
    refund_order_id: Option<String>,
    refunded_at: Option<i64>,
) -> RefundOutcome {
    RefundOutcome::AlreadyRefunded(RefundReceipt {
        access_code,
        order_number,
        refund_order_id,
        refunded_at,
        gateway_confirmed: false,
        message: "Access code was already refunded".to_string(),
    })
}
