//! Per-IP rate limiting for the checkout surface.
//!
//! Checkout and confirmation both trigger outbound provider calls, so they
//! get a strict per-IP cap. The webhook endpoint is deliberately not rate
//! limited: providers burst legitimate retries.
//!
//! Configure via `RATE_LIMIT_CHECKOUT_RPM` (default: 10).

use std::sync::Arc;
use std::time::Duration;

use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;

/// Rate limiter layer type alias using governor types directly
pub type RateLimitLayer = GovernorLayer<
    tower_governor::key_extractor::PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Strict tier for endpoints that make external API calls.
pub fn strict_layer(requests_per_minute: u32) -> RateLimitLayer {
    assert!(requests_per_minute > 0, "Rate limit must be greater than 0");

    let period_secs = 60 / requests_per_minute as u64;
    let config = GovernorConfigBuilder::default()
        .period(Duration::from_secs(period_secs.max(1)))
        .burst_size(requests_per_minute)
        .finish()
        .expect("Failed to build rate limiter config");

    GovernorLayer::new(Arc::new(config))
}
