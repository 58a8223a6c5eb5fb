//! Refund state reconciliation.
//!
//! Three independent entry points keep access codes, orders and the gateway
//! consistent:
//!
//! - [`RefundOrchestrator`] handles a single refund request end to end.
//! - [`DriftScanner`] forward-corrects codes the gateway reports as refunded.
//! - [`VerificationCorrector`] rolls back recent local refunds the gateway
//!   does not confirm.
//!
//! They never call each other; each one reads and writes through
//! [`crate::db::queries`] and talks to the outside world only through
//! [`crate::gateway::Gateway`]. Every status change appends exactly one
//! reconciliation log entry in the same transaction, so
//! [`replay_statuses`] can rebuild current state from the log alone.

mod drift;
mod orchestrator;
mod verify;

pub use drift::*;
pub use orchestrator::*;
pub use verify::*;

use std::collections::HashMap;
use std::future::Future;

use futures::future::join_all;

use crate::config::ReconcileConfig;
use crate::error::Result;
use crate::models::{AccessStatus, ReconciliationLog};

/// Run `check` over `items` in fixed-size batches.
///
/// Items inside a batch run concurrently; batches run one after another with
/// `batch_delay` in between. The first store error aborts the run after the
/// current batch settles.
pub(crate) async fn run_in_batches<T, R, F, Fut>(
    items: Vec<T>,
    config: &ReconcileConfig,
    check: F,
) -> Result<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let batch_size = config.batch_size.clamp(1, ReconcileConfig::MAX_BATCH_SIZE);
    let mut results = Vec::with_capacity(items.len());
    let mut remaining = items.into_iter().peekable();
    let mut first = true;

    while remaining.peek().is_some() {
        if !first && !config.batch_delay.is_zero() {
            tokio::time::sleep(config.batch_delay).await;
        }
        first = false;

        let batch: Vec<T> = remaining.by_ref().take(batch_size).collect();
        for outcome in join_all(batch.into_iter().map(&check)).await {
            results.push(outcome?);
        }
    }

    Ok(results)
}

/// Rebuild each access code's status by replaying the log in order.
///
/// Codes that never appear in the log are absent from the result; they still
/// hold the status they were created with (`active`).
pub fn replay_statuses(logs: &[ReconciliationLog]) -> HashMap<String, AccessStatus> {
    let mut statuses = HashMap::new();
    for entry in logs {
        statuses.insert(
            entry.access_code.clone(),
            entry.operation_type.resulting_status(),
        );
    }
    statuses
}
