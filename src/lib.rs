//! PaySync - refund state reconciliation for access codes
//!
//! Keeps locally issued access codes, their orders and the external payment
//! gateway in agreement about which purchases were refunded. Provides the
//! record store, the gateway client, the refund orchestrator, the drift
//! scanner and the verification corrector, plus the HTTP handlers exposing
//! them.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod gateway;
pub mod handlers;
pub mod id;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod reconcile;
pub mod util;
