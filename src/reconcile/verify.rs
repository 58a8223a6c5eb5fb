use std::sync::Arc;

use serde::Serialize;

use crate::config::ReconcileConfig;
use crate::db::{queries, AppState, DbPool};
use crate::error::{msg, AppError, Result};
use crate::gateway::Gateway;
use crate::models::{AccessCode, Actor};

use super::run_in_batches;

/// Upper bound on the verification look-back (30 days).
pub const MAX_WINDOW_HOURS: i64 = 720;

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    pub window_hours: i64,
    pub checked: usize,
    pub confirmed: usize,
    pub rolled_back: usize,
    pub errored: usize,
    pub rolled_back_codes: Vec<String>,
    pub errored_codes: Vec<String>,
}

enum VerifyOutcome {
    Confirmed,
    /// Record changed between listing and rollback; nothing written
    Skipped,
    RolledBack(String),
    Errored(String),
}

/// Re-checks recent local refunds against the gateway and rolls back the
/// ones the gateway does not confirm.
#[derive(Clone)]
pub struct VerificationCorrector {
    db: DbPool,
    gateway: Arc<dyn Gateway>,
    config: ReconcileConfig,
}

impl VerificationCorrector {
    pub fn new(db: DbPool, gateway: Arc<dyn Gateway>, config: ReconcileConfig) -> Self {
        Self {
            db,
            gateway,
            config,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.db.clone(), state.gateway.clone(), state.reconcile.clone())
    }

    /// Verify every code refunded within the last `window_hours`.
    pub async fn verify(&self, window_hours: i64) -> Result<VerifyReport> {
        if !(1..=MAX_WINDOW_HOURS).contains(&window_hours) {
            return Err(AppError::BadRequest(msg::INVALID_HOURS_BACK.into()));
        }

        let since = queries::now() - window_hours * 3600;
        let candidates = {
            let conn = self.db.get()?;
            queries::list_recently_refunded(&conn, since)?
        };
        tracing::debug!(
            "Verification: {} codes refunded in the last {}h",
            candidates.len(),
            window_hours
        );

        let mut report = VerifyReport {
            window_hours,
            checked: candidates.len(),
            ..VerifyReport::default()
        };

        let outcomes = run_in_batches(candidates, &self.config, |code| self.check(code)).await?;
        for outcome in outcomes {
            match outcome {
                VerifyOutcome::Confirmed => report.confirmed += 1,
                VerifyOutcome::Skipped => {}
                VerifyOutcome::RolledBack(code) => {
                    report.rolled_back += 1;
                    report.rolled_back_codes.push(code);
                }
                VerifyOutcome::Errored(code) => {
                    report.errored += 1;
                    report.errored_codes.push(code);
                }
            }
        }

        tracing::info!(
            "Verification complete: window={}h checked={} confirmed={} rolled_back={} errored={}",
            report.window_hours,
            report.checked,
            report.confirmed,
            report.rolled_back,
            report.errored
        );
        Ok(report)
    }

    async fn check(&self, access: AccessCode) -> Result<VerifyOutcome> {
        let status = self.gateway.query_status(&access.order_number).await;
        if let Some(err) = &status.error {
            tracing::warn!(
                "Verification of {} (order {}) failed, leaving refund in place: {}",
                access.code,
                access.order_number,
                err
            );
            return Ok(VerifyOutcome::Errored(access.code));
        }
        if status.is_refunded {
            tracing::debug!("Verification of {}: correct", access.code);
            return Ok(VerifyOutcome::Confirmed);
        }

        let Some(refund_order_id) = access.refund_order_id.as_deref() else {
            return Ok(VerifyOutcome::Skipped);
        };

        let payload = status.to_payload();
        let mut conn = self.db.get()?;
        let applied = queries::rollback_refund_atomic(
            &mut conn,
            &access.code,
            refund_order_id,
            Actor::VerificationCorrector,
            Some(&payload),
        )?;

        match applied {
            Some(_) => {
                tracing::warn!(
                    "Rolled back refund of {} (order {}): gateway reports not refunded",
                    access.code,
                    access.order_number
                );
                Ok(VerifyOutcome::RolledBack(access.code))
            }
            None => {
                tracing::debug!("Rollback of {} skipped: record changed", access.code);
                Ok(VerifyOutcome::Skipped)
            }
        }
    }
}
