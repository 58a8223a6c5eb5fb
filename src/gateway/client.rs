use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::GatewayConfig;

use super::sign::{self, SIGN_TYPE};
use super::{Gateway, GatewayError, RefundAttempt, StatusCheck};

/// Status fields consulted in order; the first one present decides.
const STATUS_FIELDS: &[&str] = &["refund_status", "trade_status", "status"];

/// Exact (case-insensitive) status values meaning the order was refunded.
const REFUNDED_STATUS_VALUES: &[&str] = &[
    "refunded",
    "refund",
    "refund_success",
    "trade_refund",
    "trade_refunded",
];

/// Free-text markers, only consulted when the payload has no status field.
const REFUNDED_TEXT_MARKERS: &[&str] = &[
    "refund_success",
    "trade_refund",
    "\"refunded\"",
    "已退款",
    "退款成功",
];

/// HTTP client for the payment gateway's query and refund endpoints.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::SignatureOrTransport(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Signed form parameters for a status query.
    pub fn query_params(&self, order_number: &str) -> Vec<(String, String)> {
        let mut params = vec![
            ("pid".to_string(), self.config.pid.clone()),
            ("out_trade_no".to_string(), order_number.to_string()),
        ];
        let signature = sign::sign(&params, &self.config.key);
        params.push(("sign".to_string(), signature));
        params
    }

    /// Signed form parameters for a refund request.
    pub fn refund_params(&self, order_number: &str, amount_cents: i64) -> Vec<(String, String)> {
        let mut params = vec![
            ("pid".to_string(), self.config.pid.clone()),
            ("key".to_string(), self.config.key.clone()),
            ("out_trade_no".to_string(), order_number.to_string()),
            ("money".to_string(), sign::format_money(amount_cents)),
        ];
        let signature = sign::sign(&params, &self.config.key);
        params.push(("sign".to_string(), signature));
        params.push(("sign_type".to_string(), SIGN_TYPE.to_string()));
        params
    }

    async fn post_form(&self, url: &str, params: &[(String, String)]) -> Result<String, GatewayError> {
        if self.config.key.is_empty() {
            return Err(GatewayError::SignatureOrTransport(
                "gateway key not configured".into(),
            ));
        }

        let response = self
            .client
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if status.is_server_error() {
            return Err(GatewayError::Unreachable(format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(GatewayError::Rejected(format!("HTTP {}", status.as_u16())));
        }

        Ok(body)
    }
}

#[async_trait]
impl Gateway for GatewayClient {
    async fn query_status(&self, order_number: &str) -> StatusCheck {
        let params = self.query_params(order_number);
        match self.post_form(&self.config.query_url, &params).await {
            Ok(body) => classify_query_response(&body),
            Err(e) => {
                tracing::warn!("Gateway query for order {} failed: {}", order_number, e);
                StatusCheck::failed(e, Value::Null)
            }
        }
    }

    async fn issue_refund(&self, order_number: &str, amount_cents: i64) -> RefundAttempt {
        let params = self.refund_params(order_number, amount_cents);
        match self.post_form(&self.config.refund_url, &params).await {
            Ok(body) => classify_refund_response(&body),
            Err(e) => {
                tracing::warn!("Gateway refund for order {} failed: {}", order_number, e);
                RefundAttempt::failed(e, Value::Null)
            }
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() {
        GatewayError::Unreachable(e.to_string())
    } else {
        GatewayError::SignatureOrTransport(e.to_string())
    }
}

/// `code` is the gateway's success flag: numeric 1 or the string "1".
fn is_success_code(code: &Value) -> bool {
    match code {
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s.trim() == "1",
        _ => false,
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_lowercase(),
        other => other.to_string(),
    }
}

fn rejection_message(body: &Value) -> String {
    body.get("msg")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| format!("code {}", body.get("code").unwrap_or(&Value::Null)))
}

/// Decide whether a query response says the order was refunded.
///
/// Non-JSON bodies and gateway rejections are errors and therefore never
/// "refunded". Exact status fields win over free-text markers.
pub fn classify_query_response(body: &str) -> StatusCheck {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(v @ Value::Object(_)) => v,
        _ => {
            return StatusCheck::failed(
                GatewayError::MalformedResponse("expected a JSON object".into()),
                Value::String(body.to_string()),
            );
        }
    };

    if let Some(code) = parsed.get("code") {
        if !is_success_code(code) {
            let reason = rejection_message(&parsed);
            return StatusCheck::failed(GatewayError::Rejected(reason), parsed);
        }
    }

    if let Some(status) = STATUS_FIELDS.iter().find_map(|f| parsed.get(*f)) {
        let status = value_as_text(status);
        return if REFUNDED_STATUS_VALUES.contains(&status.as_str()) {
            StatusCheck::refunded(parsed)
        } else {
            StatusCheck::not_refunded(parsed)
        };
    }

    let text = body.to_lowercase();
    if REFUNDED_TEXT_MARKERS.iter().any(|m| text.contains(m)) {
        StatusCheck::refunded(parsed)
    } else {
        StatusCheck::not_refunded(parsed)
    }
}

/// A refund is accepted only when the JSON `code` field equals 1.
pub fn classify_refund_response(body: &str) -> RefundAttempt {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(v @ Value::Object(_)) => v,
        _ => {
            return RefundAttempt::failed(
                GatewayError::MalformedResponse("expected a JSON object".into()),
                Value::String(body.to_string()),
            );
        }
    };

    match parsed.get("code") {
        Some(code) if is_success_code(code) => RefundAttempt::accepted(parsed),
        Some(_) => {
            let reason = rejection_message(&parsed);
            RefundAttempt::failed(GatewayError::Rejected(reason), parsed)
        }
        None => RefundAttempt::failed(
            GatewayError::MalformedResponse("missing code field".into()),
            parsed,
        ),
    }
}
