//! Per-IP rate limiting for the public refund endpoint.
//!
//! Every accepted refund request costs a gateway call, so `POST /refund` is
//! limited per client IP. Configure with `RATE_LIMIT_REFUND_RPM`
//! (default 10, 0 disables the limit).

use std::sync::Arc;
use std::time::Duration;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;

/// Rate limiter layer type alias using governor types directly
pub type RateLimitLayer = GovernorLayer<
    tower_governor::key_extractor::PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Build a limiter allowing `requests_per_minute` per IP, or None when
/// limiting is disabled.
pub fn refund_layer(requests_per_minute: u32) -> Option<RateLimitLayer> {
    if requests_per_minute == 0 {
        return None;
    }

    let config = GovernorConfigBuilder::default()
        .period(replenish_period(requests_per_minute))
        .burst_size(requests_per_minute)
        .finish()?;

    Some(GovernorLayer::new(Arc::new(config)))
}

/// Time to replenish one request. Millisecond resolution so limits above
/// 60 rpm are honored.
fn replenish_period(requests_per_minute: u32) -> Duration {
    Duration::from_millis((60_000 / u64::from(requests_per_minute.max(1))).max(1))
}
