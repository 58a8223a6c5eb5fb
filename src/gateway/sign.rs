//! Request signing for the payment gateway.
//!
//! The gateway verifies every request by recomputing an MD5 digest over the
//! sorted, non-empty parameters followed by the shared secret.

use md5::{Digest, Md5};

pub const SIGN_TYPE: &str = "MD5";

/// Build the canonical string that gets hashed.
///
/// Empty values and the `sign`/`sign_type` keys are dropped, the remaining
/// keys are sorted ascending and joined as `k=v` pairs with `&`, then
/// `&key=<secret>` is appended.
pub fn canonical_string(params: &[(String, String)], secret: &str) -> String {
    let mut pairs: Vec<(&str, &str)> = params
        .iter()
        .filter(|(k, v)| !v.is_empty() && k != "sign" && k != "sign_type")
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}&key={}", joined, secret)
}

/// Lowercase hex MD5 signature over `params`.
pub fn sign(params: &[(String, String)], secret: &str) -> String {
    hex::encode(Md5::digest(canonical_string(params, secret).as_bytes()))
}

/// Format integer cents as the decimal `money` field ("12.50").
pub fn format_money(amount_cents: i64) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let abs = amount_cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
