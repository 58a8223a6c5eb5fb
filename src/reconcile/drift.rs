use std::sync::Arc;

use serde::Serialize;

use crate::config::ReconcileConfig;
use crate::db::{queries, AppState, DbPool};
use crate::error::Result;
use crate::gateway::Gateway;
use crate::id::EntityType;
use crate::models::{AccessCode, Actor, OperationType};

use super::run_in_batches;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Active codes examined, including the ones whose query failed
    pub checked: usize,
    pub fixed: usize,
    pub errored: usize,
    pub fixed_codes: Vec<String>,
    pub errored_codes: Vec<String>,
}

enum DriftOutcome {
    InSync,
    Fixed(String),
    Errored(String),
}

/// Finds active access codes the gateway already refunded and marks them
/// refunded locally.
#[derive(Clone)]
pub struct DriftScanner {
    db: DbPool,
    gateway: Arc<dyn Gateway>,
    config: ReconcileConfig,
}

impl DriftScanner {
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

    pub async fn sweep(&self) -> Result<SweepReport> {
        let candidates = {
            let conn = self.db.get()?;
            queries::list_active_access_codes(&conn)?
        };
        tracing::debug!("Drift sweep: {} active access codes", candidates.len());

        let mut report = SweepReport {
            checked: candidates.len(),
            ..SweepReport::default()
        };

        let outcomes = run_in_batches(candidates, &self.config, |code| self.check(code)).await?;
        for outcome in outcomes {
            match outcome {
                DriftOutcome::InSync => {}
                DriftOutcome::Fixed(code) => {
                    report.fixed += 1;
                    report.fixed_codes.push(code);
                }
                DriftOutcome::Errored(code) => {
                    report.errored += 1;
                    report.errored_codes.push(code);
                }
            }
        }

        tracing::info!(
            "Drift sweep complete: checked={} fixed={} errored={}",
            report.checked,
            report.fixed,
            report.errored
        );
        Ok(report)
    }

    async fn check(&self, access: AccessCode) -> Result<DriftOutcome> {
        let status = self.gateway.query_status(&access.order_number).await;
        if let Some(err) = &status.error {
            tracing::warn!(
                "Drift check for {} (order {}) failed: {}",
                access.code,
                access.order_number,
                err
            );
            return Ok(DriftOutcome::Errored(access.code));
        }
        if !status.is_refunded {
            return Ok(DriftOutcome::InSync);
        }

        let payload = status.to_payload();
        let refund_order_id = EntityType::RefundOrder.gen_id();
        let mut conn = self.db.get()?;
        let applied = queries::mark_refunded_atomic(
            &mut conn,
            &queries::RefundTransition {
                code: &access.code,
                operation: OperationType::DriftFix,
                performed_by: Actor::DriftScanner,
                refunded_at: queries::now(),
                refund_order_id: &refund_order_id,
                gateway_response: Some(&payload),
            },
        )?;

        match applied {
            Some(_) => {
                tracing::info!(
                    "Drift fix: access code {} (order {}) refunded at gateway, marked refunded",
                    access.code,
                    access.order_number
                );
                Ok(DriftOutcome::Fixed(access.code))
            }
            None => {
                tracing::debug!("Drift fix for {} skipped: already refunded", access.code);
                Ok(DriftOutcome::InSync)
            }
        }
    }
}
