/// Metrics and telemetry for StudentHub
///
/// Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Notification fan-out and email delivery
/// - Domain activity (credit decisions, event registrations)
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // ========== Notification Metrics ==========

    /// Notifications created, by category
    pub static ref NOTIFICATIONS_CREATED: IntCounterVec = register_int_counter_vec!(
        "notifications_created_total",
        "Total notifications created",
        &["category"]
    )
    .unwrap();

    /// Notification emails successfully handed to the transport
    pub static ref EMAILS_SENT: IntCounter = register_int_counter!(
        "notification_emails_sent_total",
        "Total notification emails sent"
    )
    .unwrap();

    /// Notification emails that failed (logged and swallowed)
    pub static ref EMAILS_FAILED: IntCounter = register_int_counter!(
        "notification_emails_failed_total",
        "Total notification emails that failed to send"
    )
    .unwrap();

    // ========== Domain Metrics ==========

    /// Credit decisions, by outcome
    pub static ref CREDIT_DECISIONS: IntCounterVec = register_int_counter_vec!(
        "credit_decisions_total",
        "Total credit validation decisions",
        &["outcome"]
    )
    .unwrap();

    /// Event participations registered
    pub static ref EVENT_REGISTRATIONS: IntCounter = register_int_counter!(
        "event_registrations_total",
        "Total event registrations"
    )
    .unwrap();
}

/// Middleware recording request counts and latencies
pub async fn track_metrics(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), &path, &status])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method.as_str(), &path])
        .observe(start.elapsed().as_secs_f64());

    response
}

/// Render all registered metrics in the Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_and_gather() {
        NOTIFICATIONS_CREATED.with_label_values(&["system"]).inc();
        EMAILS_SENT.inc();
        let text = gather();
        assert!(text.contains("notifications_created_total"));
    }
}
