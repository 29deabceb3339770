//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Auth Metrics
    pub static ref SIGNINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authgate_signins_total", "Total number of sign-in attempts"),
        &["provider", "outcome"]
    ).expect("metric can be created");
    pub static ref SESSION_RESOLUTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authgate_session_resolutions_total", "Total number of session token resolutions"),
        &["outcome"]
    ).expect("metric can be created");

    // Gate Metrics
    pub static ref CONTENT_FETCH_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authgate_content_fetch_total", "Total number of downstream content fetches"),
        &["outcome"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("authgate_errors_total", "Total number of error responses"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Register all metrics with the global registry
///
/// Safe to call more than once; repeated registrations are ignored.
pub fn init_metrics() {
    let collectors: [Box<dyn prometheus::core::Collector>; 4] = [
        Box::new(SIGNINS_TOTAL.clone()),
        Box::new(SESSION_RESOLUTIONS_TOTAL.clone()),
        Box::new(CONTENT_FETCH_TOTAL.clone()),
        Box::new(ERRORS_TOTAL.clone()),
    ];

    for collector in collectors {
        if let Err(error) = REGISTRY.register(collector) {
            tracing::debug!(%error, "Metric already registered");
        }
    }
}
