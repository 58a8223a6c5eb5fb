use rusqlite::Connection;

/// Initialize the database schema.
///
/// `access_codes` and `orders` are the two mutable collections;
/// `reconciliation_logs` is append-only and its rowid order is the replay order.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Orders (created by the payment-success callback)
        CREATE TABLE IF NOT EXISTS orders (
            order_number TEXT PRIMARY KEY,
            payment_status TEXT NOT NULL CHECK (payment_status IN ('pending', 'paid', 'failed')),
            refund_status TEXT NOT NULL DEFAULT 'none' CHECK (refund_status IN ('none', 'refunded')),
            amount_cents INTEGER NOT NULL,
            paid_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            refunded_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_orders_refund_status ON orders(refund_status);

        -- Access codes (the only entitlement check read by the product)
        CREATE TABLE IF NOT EXISTS access_codes (
            code TEXT PRIMARY KEY,
            order_number TEXT NOT NULL REFERENCES orders(order_number),
            status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'refunded')),
            amount_cents INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            refunded_at INTEGER,
            refund_order_id TEXT,
            CHECK (status = 'active' OR refunded_at IS NOT NULL)
        );
        CREATE INDEX IF NOT EXISTS idx_access_codes_order ON access_codes(order_number);
        CREATE INDEX IF NOT EXISTS idx_access_codes_status ON access_codes(status, created_at);
        CREATE INDEX IF NOT EXISTS idx_access_codes_refunded ON access_codes(status, refunded_at);

        -- Reconciliation log (append-only, one row per status transition)
        CREATE TABLE IF NOT EXISTS reconciliation_logs (
            id TEXT PRIMARY KEY,
            operation_type TEXT NOT NULL CHECK (operation_type IN ('manual_refund', 'drift_fix', 'rollback')),
            access_code TEXT NOT NULL,
            order_number TEXT NOT NULL,
            gateway_response TEXT,
            performed_by TEXT NOT NULL,
            performed_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_reconciliation_logs_code ON reconciliation_logs(access_code);
        CREATE INDEX IF NOT EXISTS idx_reconciliation_logs_time ON reconciliation_logs(performed_at);

        CREATE TRIGGER IF NOT EXISTS reconciliation_logs_no_update
        BEFORE UPDATE ON reconciliation_logs
        BEGIN
            SELECT RAISE(ABORT, 'reconciliation_logs is append-only');
        END;

        CREATE TRIGGER IF NOT EXISTS reconciliation_logs_no_delete
        BEFORE DELETE ON reconciliation_logs
        BEGIN
            SELECT RAISE(ABORT, 'reconciliation_logs is append-only');
        END;
        "#,
    )?;
    Ok(())
}
