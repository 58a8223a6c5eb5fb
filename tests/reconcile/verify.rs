//! Tests for VerificationCorrector::verify.

#[path = "../common/mod.rs"]
mod common;
use common::*;

use paysync::error::AppError;
use paysync::reconcile::VerificationCorrector;

#[tokio::test]
async fn test_verify_rolls_back_unconfirmed_refund() {
    let env = TestEnv::new();
    let refunded = env.refunded_order("ORD-V1", 2);
    env.gateway.set_query("ORD-V1", QueryBehavior::NotRefunded);

    let report = VerificationCorrector::from_state(&env.state)
        .verify(24)
        .await
        .unwrap();

    assert_eq!(report.window_hours, 24);
    assert_eq!(report.checked, 1);
    assert_eq!(report.rolled_back, 1);
    assert_eq!(report.rolled_back_codes, vec![refunded.code.clone()]);

    let code = env.access_code(&refunded.code);
    assert_eq!(code.status, AccessStatus::Active);
    assert!(code.refunded_at.is_none());
    assert!(code.refund_order_id.is_none());

    let order = env.order("ORD-V1");
    assert_eq!(order.refund_status, RefundStatus::None);
    assert!(order.refunded_at.is_none());

    let logs = env.logs_for(&refunded.code);
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1].operation_type, OperationType::Rollback);
    assert_eq!(logs[1].performed_by, Actor::VerificationCorrector);
}

#[tokio::test]
async fn test_verify_confirms_gateway_refunds() {
    let env = TestEnv::new();
    let refunded = env.refunded_order("ORD-V2", 2);
    env.gateway.set_query("ORD-V2", QueryBehavior::Refunded);

    let report = VerificationCorrector::from_state(&env.state)
        .verify(24)
        .await
        .unwrap();

    assert_eq!(report.confirmed, 1);
    assert_eq!(report.rolled_back, 0);
    assert_eq!(env.access_code(&refunded.code).status, AccessStatus::Refunded);
    assert_eq!(
        env.logs_for(&refunded.code).len(),
        1,
        "confirmation is not a transition and must not be logged"
    );
}

#[tokio::test]
async fn test_verify_never_rolls_back_on_error() {
    let env = TestEnv::new();
    let unreachable = env.refunded_order("ORD-V3", 1);
    let rejected = env.refunded_order("ORD-V4", 1);
    env.gateway.set_query(
        "ORD-V3",
        QueryBehavior::Fail(GatewayError::Unreachable("connection refused".into())),
    );
    env.gateway.set_query(
        "ORD-V4",
        QueryBehavior::Fail(GatewayError::Rejected("sign error".into())),
    );

    let report = VerificationCorrector::from_state(&env.state)
        .verify(24)
        .await
        .unwrap();

    assert_eq!(report.errored, 2);
    assert_eq!(report.rolled_back, 0);
    assert_eq!(env.access_code(&unreachable.code).status, AccessStatus::Refunded);
    assert_eq!(env.access_code(&rejected.code).status, AccessStatus::Refunded);
}

#[tokio::test]
async fn test_verify_only_looks_inside_window() {
    let env = TestEnv::new();
    let inside = env.refunded_order("ORD-V5", 3);
    let outside = env.refunded_order("ORD-V6", 30);

    let report = VerificationCorrector::from_state(&env.state)
        .verify(24)
        .await
        .unwrap();

    assert_eq!(report.checked, 1);
    assert_eq!(report.rolled_back_codes, vec![inside.code.clone()]);
    assert_eq!(env.access_code(&outside.code).status, AccessStatus::Refunded);
}

#[tokio::test]
async fn test_verify_rejects_out_of_range_window() {
    let env = TestEnv::new();
    let corrector = VerificationCorrector::from_state(&env.state);

    assert!(matches!(corrector.verify(0).await, Err(AppError::BadRequest(_))));
    assert!(matches!(corrector.verify(721).await, Err(AppError::BadRequest(_))));
    assert!(corrector.verify(720).await.is_ok());
}

#[tokio::test]
async fn test_rolled_back_code_can_be_refunded_again() {
    let env = TestEnv::new();
    let refunded = env.refunded_order("ORD-V7", 1);

    VerificationCorrector::from_state(&env.state)
        .verify(24)
        .await
        .unwrap();
    assert_eq!(env.access_code(&refunded.code).status, AccessStatus::Active);

    let outcome = paysync::reconcile::RefundOrchestrator::from_state(&env.state)
        .refund(&refunded.code, Actor::Customer)
        .await
        .unwrap();

    assert!(!outcome.is_already_refunded());
    let ops: Vec<OperationType> = env
        .logs_for(&refunded.code)
        .iter()
        .map(|l| l.operation_type)
        .collect();
    assert_eq!(
        ops,
        vec![
            OperationType::ManualRefund,
            OperationType::Rollback,
            OperationType::ManualRefund
        ]
    );
}
