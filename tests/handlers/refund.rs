//! Integration tests for POST /refund.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

#[path = "../common/mod.rs"]
mod common;
use common::*;

fn refund_request(body: Value, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/refund")
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn test_refund_returns_receipt() {
    let env = TestEnv::new();
    let access = env.paid_order("ORD-H1", 1);

    let response = env
        .app()
        .oneshot(refund_request(json!({"access_code": access.code}), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "refunded");
    assert_eq!(json["access_code"], access.code.as_str());
    assert_eq!(json["order_number"], "ORD-H1");
    assert_eq!(json["gateway_confirmed"], true);
    assert!(json["refund_order_id"].as_str().unwrap().starts_with("ps_rfd_"));

    let logs = env.logs_for(&access.code);
    assert_eq!(logs[0].performed_by, Actor::Customer);
}

#[tokio::test]
async fn test_refund_twice_reports_already_refunded() {
    let env = TestEnv::new();
    let access = env.paid_order("ORD-H2", 1);

    let first = env
        .app()
        .oneshot(refund_request(json!({"access_code": access.code}), None))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = env
        .app()
        .oneshot(refund_request(json!({"access_code": access.code}), None))
        .await
        .unwrap();

    assert_eq!(
        second.status(),
        StatusCode::OK,
        "already refunded is a success, not an error"
    );
    let json = body_json(second).await;
    assert_eq!(json["status"], "already_refunded");
}

#[tokio::test]
async fn test_operator_token_marks_operator_as_initiator() {
    let env = TestEnv::new();
    let access = env.paid_order("ORD-H3", 1);

    let response = env
        .app()
        .oneshot(refund_request(
            json!({"access_code": access.code}),
            Some(OPERATOR_KEY),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(env.logs_for(&access.code)[0].performed_by, Actor::Operator);
}

#[tokio::test]
async fn test_wrong_token_is_treated_as_customer() {
    let env = TestEnv::new();
    let access = env.paid_order("ORD-H4", 1);

    let response = env
        .app()
        .oneshot(refund_request(
            json!({"access_code": access.code}),
            Some("not-the-operator-key"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(env.logs_for(&access.code)[0].performed_by, Actor::Customer);
}

#[tokio::test]
async fn test_unknown_code_is_404() {
    let env = TestEnv::new();

    let response = env
        .app()
        .oneshot(refund_request(json!({"access_code": "ABCDEFGHJKLM"}), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["details"], paysync::error::msg::CODE_NOT_FOUND);
}

#[tokio::test]
async fn test_expired_window_is_422() {
    let env = TestEnv::new();
    let access = env.paid_order("ORD-H5", 8);

    let response = env
        .app()
        .oneshot(refund_request(json!({"access_code": access.code}), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(env.access_code(&access.code).status, AccessStatus::Active);
}

#[tokio::test]
async fn test_unpaid_order_is_409() {
    let env = TestEnv::new();
    insert_unpaid_order(&env.conn(), "ORD-H6", "UNPAIDH62345");

    let response = env
        .app()
        .oneshot(refund_request(json!({"access_code": "UNPAIDH62345"}), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_missing_access_code_field_is_400() {
    let env = TestEnv::new();

    let response = env
        .app()
        .oneshot(refund_request(json!({"code": "ABCDEFGHJKLM"}), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Bad request");
}

#[tokio::test]
async fn test_health() {
    let env = TestEnv::new();

    let response = env
        .app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}
