//! Prometheus metrics for the download pipeline
//!
//! Tracks:
//! - Fetch attempts per method and outcome
//! - Post-processing actions (merge / re-encode) and their outcome
//! - Pipeline outcomes and end-to-end duration
//! - Delivery-time size rejections

// Registration only fails on a duplicate name, which is a programming error.
#![allow(clippy::expect_used)]

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Encoder, Histogram, TextEncoder,
};

/// Fetch attempts
/// Labels: method (videodl/yt-dlp/browser), outcome (artifact/empty/error)
pub static FETCH_ATTEMPTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "shortgrab_fetch_attempts_total",
        "Fetch executor invocations by method and outcome",
        &["method", "outcome"]
    )
    .expect("fetch attempts metric registers once")
});

/// Post-processing actions
/// Labels: action (merge/reencode), outcome (ok/failed)
pub static POSTPROCESS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "shortgrab_postprocess_total",
        "Post-processing actions by kind and outcome",
        &["action", "outcome"]
    )
    .expect("postprocess metric registers once")
});

/// Pipeline outcomes
/// Labels: outcome (completed/unsupported/fetch_failed/unexpected)
pub static PIPELINE_OUTCOMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "shortgrab_pipeline_outcomes_total",
        "Finished pipeline runs by outcome",
        &["outcome"]
    )
    .expect("pipeline outcome metric registers once")
});

/// End-to-end pipeline duration in seconds
pub static PIPELINE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "shortgrab_pipeline_duration_seconds",
        "Time from URL selection to a located artifact",
        vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0]
    )
    .expect("pipeline duration metric registers once")
});

/// Artifacts rejected at delivery for exceeding the size ceiling
pub static DELIVERY_TOO_LARGE_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "shortgrab_delivery_too_large_total",
        "Completed artifacts rejected at delivery for size"
    )
    .expect("delivery size metric registers once")
});

/// Renders every registered metric in the Prometheus text format.
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        log::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_includes_touched_metrics() {
        FETCH_ATTEMPTS_TOTAL.with_label_values(&["yt-dlp", "artifact"]).inc();
        DELIVERY_TOO_LARGE_TOTAL.inc();
        let text = gather_text();
        assert!(text.contains("shortgrab_fetch_attempts_total"));
        assert!(text.contains("shortgrab_delivery_too_large_total"));
    }
}
