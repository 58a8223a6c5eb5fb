use chrono::Utc;
use rusqlite::{params, Connection, TransactionBehavior};

use crate::error::{msg, AppError, Result};
use crate::id::EntityType;
use crate::models::*;

use super::from_row::{
    query_all, query_one, ACCESS_CODE_COLS, ORDER_COLS, RECONCILIATION_LOG_COLS,
};

pub fn now() -> i64 {
    Utc::now().timestamp()
}

// ============ Access Codes & Orders ============

/// Generate a 12-character access code from an unambiguous alphabet (~60 bits).
pub fn generate_access_code() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let chars: Vec<char> = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789".chars().collect();

    (0..CODE_MAX_LEN)
        .map(|_| chars[rng.gen_range(0..chars.len())])
        .collect()
}

/// Create an order and its access code together, as the payment-success
/// callback does. Both rows are written in one transaction.
pub fn record_paid_order(conn: &mut Connection, input: &NewPaidOrder) -> Result<PaidOrder> {
    let order_number = input.order_number.trim();
    if order_number.is_empty() {
        return Err(AppError::BadRequest("order_number is required".into()));
    }
    if input.amount_cents < 0 {
        return Err(AppError::BadRequest("amount_cents must not be negative".into()));
    }

    let code = match &input.code {
        Some(raw) => normalize_code(raw)
            .ok_or_else(|| AppError::BadRequest(msg::INVALID_ACCESS_CODE.into()))?,
        None => generate_access_code(),
    };

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if get_order(&tx, order_number)?.is_some() {
        return Err(AppError::Conflict(msg::DUPLICATE_ORDER.into()));
    }
    if get_access_code(&tx, &code)?.is_some() {
        return Err(AppError::Conflict(msg::DUPLICATE_CODE.into()));
    }

    let created_at = now();

    tx.execute(
        "INSERT INTO orders (order_number, payment_status, refund_status, amount_cents, paid_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            order_number,
            PaymentStatus::Paid.as_ref(),
            RefundStatus::None.as_ref(),
            input.amount_cents,
            input.paid_at,
            created_at
        ],
    )?;

    tx.execute(
        "INSERT INTO access_codes (code, order_number, status, amount_cents, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            &code,
            order_number,
            AccessStatus::Active.as_ref(),
            input.amount_cents,
            created_at
        ],
    )?;

    tx.commit()?;

    Ok(PaidOrder {
        order: Order {
            order_number: order_number.to_string(),
            payment_status: PaymentStatus::Paid,
            refund_status: RefundStatus::None,
            amount_cents: input.amount_cents,
            paid_at: input.paid_at,
            created_at,
            refunded_at: None,
        },
        access_code: AccessCode {
            code,
            order_number: order_number.to_string(),
            status: AccessStatus::Active,
            amount_cents: input.amount_cents,
            created_at,
            refunded_at: None,
            refund_order_id: None,
        },
    })
}

pub fn get_access_code(conn: &Connection, code: &str) -> Result<Option<AccessCode>> {
    query_one(
        conn,
        &format!("SELECT {} FROM access_codes WHERE code = ?1", ACCESS_CODE_COLS),
        &[&code],
    )
}

pub fn get_order(conn: &Connection, order_number: &str) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!("SELECT {} FROM orders WHERE order_number = ?1", ORDER_COLS),
        &[&order_number],
    )
}

/// All codes the drift scanner must check against the gateway.
pub fn list_active_access_codes(conn: &Connection) -> Result<Vec<AccessCode>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM access_codes WHERE status = 'active' ORDER BY created_at, code",
            ACCESS_CODE_COLS
        ),
        &[],
    )
}

/// Refunded codes whose refund was stamped at or after `since`.
pub fn list_recently_refunded(conn: &Connection, since: i64) -> Result<Vec<AccessCode>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM access_codes
             WHERE status = 'refunded' AND refunded_at >= ?1
             ORDER BY refunded_at, code",
            ACCESS_CODE_COLS
        ),
        &[&since],
    )
}

// ============ Status Transitions ============

/// A forward transition (`active` -> `refunded`) to apply atomically.
#[derive(Debug, Clone)]
pub struct RefundTransition<'a> {
    pub code: &'a str,
    pub operation: OperationType,
    pub performed_by: Actor,
    pub refunded_at: i64,
    pub refund_order_id: &'a str,
    pub gateway_response: Option<&'a serde_json::Value>,
}

/// Mark an access code and its order refunded and append the matching log
/// entry, all in one transaction.
///
/// The update is guarded on `status = 'active'`: if another writer already
/// refunded the code, nothing is written and `Ok(None)` is returned.
pub fn mark_refunded_atomic(
    conn: &mut Connection,
    transition: &RefundTransition,
) -> Result<Option<ReconciliationLog>> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let Some(current) = get_access_code(&tx, transition.code)? else {
        return Err(AppError::CodeNotFound);
    };

    let updated = tx.execute(
        "UPDATE access_codes SET status = 'refunded', refunded_at = ?1, refund_order_id = ?2
         WHERE code = ?3 AND status = 'active'",
        params![transition.refunded_at, transition.refund_order_id, transition.code],
    )?;
    if updated == 0 {
        return Ok(None);
    }

    tx.execute(
        "UPDATE orders SET refund_status = 'refunded', refunded_at = ?1 WHERE order_number = ?2",
        params![transition.refunded_at, &current.order_number],
    )?;

    let log = append_reconciliation_log(
        &tx,
        transition.operation,
        transition.code,
        &current.order_number,
        transition.gateway_response,
        transition.performed_by,
    )?;

    tx.commit()?;
    Ok(Some(log))
}

/// Return a refunded access code to `active`, clear the refund fields on both
/// the code and its order, and append a `rollback` log entry.
///
/// Guarded on the code still carrying the `refund_order_id` the caller
/// verified, so a refund re-applied in the meantime is left alone.
pub fn rollback_refund_atomic(
    conn: &mut Connection,
    code: &str,
    expected_refund_order_id: &str,
    performed_by: Actor,
    gateway_response: Option<&serde_json::Value>,
) -> Result<Option<ReconciliationLog>> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let Some(current) = get_access_code(&tx, code)? else {
        return Err(AppError::CodeNotFound);
    };

    let updated = tx.execute(
        "UPDATE access_codes SET status = 'active', refunded_at = NULL, refund_order_id = NULL
         WHERE code = ?1 AND status = 'refunded' AND refund_order_id = ?2",
        params![code, expected_refund_order_id],
    )?;
    if updated == 0 {
        return Ok(None);
    }

    tx.execute(
        "UPDATE orders SET refund_status = 'none', refunded_at = NULL WHERE order_number = ?1",
        params![&current.order_number],
    )?;

    let log = append_reconciliation_log(
        &tx,
        OperationType::Rollback,
        code,
        &current.order_number,
        gateway_response,
        performed_by,
    )?;

    tx.commit()?;
    Ok(Some(log))
}

// ============ Reconciliation Log ============

pub fn append_reconciliation_log(
    conn: &Connection,
    operation_type: OperationType,
    access_code: &str,
    order_number: &str,
    gateway_response: Option<&serde_json::Value>,
    performed_by: Actor,
) -> Result<ReconciliationLog> {
    let id = EntityType::ReconciliationLog.gen_id();
    let performed_at = now();
    let response_str = gateway_response.map(|r| r.to_string());

    conn.execute(
        "INSERT INTO reconciliation_logs (id, operation_type, access_code, order_number, gateway_response, performed_by, performed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &id,
            operation_type.as_ref(),
            access_code,
            order_number,
            &response_str,
            performed_by.as_ref(),
            performed_at
        ],
    )?;

    Ok(ReconciliationLog {
        id,
        operation_type,
        access_code: access_code.to_string(),
        order_number: order_number.to_string(),
        gateway_response: gateway_response.cloned(),
        performed_by,
        performed_at,
    })
}

/// Every log entry in insertion order.
pub fn list_reconciliation_logs(conn: &Connection) -> Result<Vec<ReconciliationLog>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM reconciliation_logs ORDER BY rowid",
            RECONCILIATION_LOG_COLS
        ),
        &[],
    )
}

pub fn list_reconciliation_logs_for_code(
    conn: &Connection,
    code: &str,
) -> Result<Vec<ReconciliationLog>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM reconciliation_logs WHERE access_code = ?1 ORDER BY rowid",
            RECONCILIATION_LOG_COLS
        ),
        &[&code],
    )
}
