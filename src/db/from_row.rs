//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to rusqlite errors.
///
/// Corrupt enum values surface as a typed error instead of a panic.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const ACCESS_CODE_COLS: &str =
    "code, order_number, status, amount_cents, created_at, refunded_at, refund_order_id";

pub const ORDER_COLS: &str =
    "order_number, payment_status, refund_status, amount_cents, paid_at, created_at, refunded_at";

pub const RECONCILIATION_LOG_COLS: &str =
    "id, operation_type, access_code, order_number, gateway_response, performed_by, performed_at";

// ============ FromRow Implementations ============

impl FromRow for AccessCode {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(AccessCode {
            code: row.get(0)?,
            order_number: row.get(1)?,
            status: parse_enum(row, 2, "status")?,
            amount_cents: row.get(3)?,
            created_at: row.get(4)?,
            refunded_at: row.get(5)?,
            refund_order_id: row.get(6)?,
        })
    }
}

impl FromRow for Order {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Order {
            order_number: row.get(0)?,
            payment_status: parse_enum(row, 1, "payment_status")?,
            refund_status: parse_enum(row, 2, "refund_status")?,
            amount_cents: row.get(3)?,
            paid_at: row.get(4)?,
            created_at: row.get(5)?,
            refunded_at: row.get(6)?,
        })
    }
}

impl FromRow for ReconciliationLog {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        // The payload is opaque: keep non-JSON text as a JSON string
        let gateway_response = row.get::<_, Option<String>>(4)?.map(|raw| {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        });
        Ok(ReconciliationLog {
            id: row.get(0)?,
            operation_type: parse_enum(row, 1, "operation_type")?,
            access_code: row.get(2)?,
            order_number: row.get(3)?,
            gateway_response,
            performed_by: parse_enum(row, 5, "performed_by")?,
            performed_at: row.get(6)?,
        })
    }
}
