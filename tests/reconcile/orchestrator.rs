//! Tests for RefundOrchestrator::refund.

#[path = "../common/mod.rs"]
mod common;
use common::*;

use paysync::error::AppError;
use paysync::reconcile::{RefundOrchestrator, RefundOutcome};

fn orchestrator(env: &TestEnv) -> RefundOrchestrator {
    RefundOrchestrator::from_state(&env.state)
}

#[tokio::test]
async fn test_refund_within_window_succeeds() {
    let env = TestEnv::new();
    let access = env.paid_order("ORD-R1", 6);

    let outcome = orchestrator(&env)
        .refund(&access.code, Actor::Customer)
        .await
        .expect("refund within window should succeed");

    let RefundOutcome::Refunded(receipt) = outcome else {
        panic!("expected Refunded, got {:?}", outcome);
    };
    assert!(receipt.gateway_confirmed);
    assert!(receipt.message.contains("gateway confirmed"));
    assert!(receipt.refund_order_id.as_deref().unwrap().starts_with("ps_rfd_"));

    let code = env.access_code(&access.code);
    assert_eq!(code.status, AccessStatus::Refunded);
    assert_eq!(code.refunded_at, receipt.refunded_at);
    assert_eq!(code.refund_order_id, receipt.refund_order_id);
    assert_eq!(env.order("ORD-R1").refund_status, RefundStatus::Refunded);

    let logs = env.logs_for(&access.code);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].operation_type, OperationType::ManualRefund);
    assert_eq!(logs[0].performed_by, Actor::Customer);
    assert_eq!(
        logs[0].gateway_response.as_ref().unwrap()["accepted"],
        serde_json::json!(true)
    );
}

#[tokio::test]
async fn test_refund_outside_window_is_rejected_without_side_effects() {
    let env = TestEnv::new();
    let access = env.paid_order("ORD-R2", 8);

    let result = orchestrator(&env).refund(&access.code, Actor::Customer).await;

    match result {
        Err(AppError::RefundWindowExpired {
            days_since_paid,
            window_days,
        }) => {
            assert_eq!(window_days, 7);
            assert!(days_since_paid >= 8);
        }
        other => panic!("expected RefundWindowExpired, got {:?}", other),
    }
    assert_eq!(env.gateway.refund_calls(), 0, "gateway must not be called");
    assert_eq!(env.access_code(&access.code).status, AccessStatus::Active);
    assert!(env.logs_for(&access.code).is_empty());
}

#[tokio::test]
async fn test_second_refund_is_idempotent() {
    let env = TestEnv::new();
    let access = env.paid_order("ORD-R3", 1);
    let orch = orchestrator(&env);

    let first = orch.refund(&access.code, Actor::Customer).await.unwrap();
    let second = orch.refund(&access.code, Actor::Customer).await.unwrap();

    assert!(!first.is_already_refunded());
    assert!(second.is_already_refunded());
    assert_eq!(
        second.receipt().refund_order_id,
        first.receipt().refund_order_id,
        "already-refunded receipt should echo the original refund"
    );
    assert_eq!(env.gateway.refund_calls(), 1, "second call must not reach the gateway");
    assert_eq!(env.logs_for(&access.code).len(), 1);
}

#[tokio::test]
async fn test_refund_normalizes_input_code() {
    let env = TestEnv::new();
    let access = env.paid_order("ORD-R4", 1);
    let messy = format!("  {}  ", access.code.to_lowercase());

    let outcome = orchestrator(&env).refund(&messy, Actor::Customer).await.unwrap();

    assert_eq!(outcome.receipt().access_code, access.code);
}

#[tokio::test]
async fn test_unknown_and_malformed_codes_are_not_found() {
    let env = TestEnv::new();
    let orch = orchestrator(&env);

    let unknown = orch.refund("ABCDEFGHJKLM", Actor::Customer).await;
    assert!(matches!(unknown, Err(AppError::CodeNotFound)));

    let malformed = orch.refund("not a code!", Actor::Customer).await;
    assert!(matches!(malformed, Err(AppError::CodeNotFound)));

    assert_eq!(env.gateway.refund_calls(), 0);
}

#[tokio::test]
async fn test_unpaid_order_is_rejected() {
    let env = TestEnv::new();
    insert_unpaid_order(&env.conn(), "ORD-UNPAID", "UNPAID234567");

    let result = orchestrator(&env).refund("UNPAID234567", Actor::Customer).await;

    assert!(matches!(result, Err(AppError::OrderNotPaid(ref o)) if o == "ORD-UNPAID"));
    assert_eq!(env.gateway.refund_calls(), 0);
}

#[tokio::test]
async fn test_gateway_rejection_still_refunds_locally() {
    let env = TestEnv::new();
    env.gateway
        .set_refund_behavior(RefundBehavior::Reject("insufficient balance".into()));
    let access = env.paid_order("ORD-R5", 1);

    let outcome = orchestrator(&env)
        .refund(&access.code, Actor::Operator)
        .await
        .expect("gateway rejection is not an orchestrator error");

    let receipt = outcome.receipt();
    assert!(!outcome.is_already_refunded());
    assert!(!receipt.gateway_confirmed);
    assert!(receipt.message.contains("pending"));
    assert_eq!(env.access_code(&access.code).status, AccessStatus::Refunded);

    let logs = env.logs_for(&access.code);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].performed_by, Actor::Operator);
    let payload = logs[0].gateway_response.as_ref().unwrap();
    assert_eq!(payload["accepted"], serde_json::json!(false));
    assert_eq!(payload["error"]["kind"], "rejected");
}

#[tokio::test]
async fn test_gateway_timeout_still_refunds_locally() {
    let env = TestEnv::new();
    env.gateway
        .set_refund_behavior(RefundBehavior::Fail(GatewayError::Timeout));
    let access = env.paid_order("ORD-R6", 1);

    let outcome = orchestrator(&env)
        .refund(&access.code, Actor::Customer)
        .await
        .unwrap();

    assert!(!outcome.receipt().gateway_confirmed);
    assert_eq!(env.access_code(&access.code).status, AccessStatus::Refunded);
}

#[tokio::test]
async fn test_concurrent_refunds_log_once() {
    let env = TestEnv::new();
    let access = env.paid_order("ORD-R7", 1);
    let orch = orchestrator(&env);

    let (a, b) = tokio::join!(
        orch.refund(&access.code, Actor::Customer),
        orch.refund(&access.code, Actor::Operator)
    );

    let outcomes = [a.unwrap(), b.unwrap()];
    let refunded = outcomes.iter().filter(|o| !o.is_already_refunded()).count();
    assert_eq!(refunded, 1, "exactly one request should perform the refund");
    assert_eq!(env.logs_for(&access.code).len(), 1);
}

#[tokio::test]
async fn test_oversized_refund_window_does_not_overflow() {
    let env = TestEnv::with_config(ReconcileConfig {
        refund_window_days: i64::MAX,
        batch_delay: std::time::Duration::ZERO,
        ..ReconcileConfig::default()
    });
    let access = env.paid_order("ORD-R9", 400);

    let outcome = orchestrator(&env)
        .refund(&access.code, Actor::Customer)
        .await
        .expect("window wider than the order's age should allow the refund");

    assert!(!outcome.is_already_refunded());
}
