//! Prometheus metrics exporter
//!
//! Counts pipeline activity and times outbound SAS calls, exposed in
//! Prometheus text format on the monitoring listener.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Pipeline activity counters and SAS call timings
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Completed pipeline cycles
    pub cycles_total: AtomicU64,
    /// Pipeline cycles that ended in an error
    pub cycle_errors_total: AtomicU64,
    /// Requests claimed from the queue
    pub requests_dequeued_total: AtomicU64,
    /// Requests marked processed
    pub requests_processed_total: AtomicU64,
    /// post_to_sas failures
    pub router_errors_total: AtomicU64,
    /// Radio Controller relay failures (best-effort path)
    pub rc_relay_failures_total: AtomicU64,

    sas_request_count: AtomicU64,
    sas_request_micros_total: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the duration of one full post_to_sas call
    pub fn observe_sas_request(&self, elapsed: Duration) {
        self.sas_request_count.fetch_add(1, Ordering::Relaxed);
        self.sas_request_micros_total
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let mut out = String::new();

        add_counter(
            &mut out,
            "dp_cycles_total",
            self.cycles_total.load(Ordering::Relaxed),
            "Completed pipeline cycles",
        );
        add_counter(
            &mut out,
            "dp_cycle_errors_total",
            self.cycle_errors_total.load(Ordering::Relaxed),
            "Pipeline cycles that ended in an error",
        );
        add_counter(
            &mut out,
            "dp_requests_dequeued_total",
            self.requests_dequeued_total.load(Ordering::Relaxed),
            "Requests claimed from the pending queue",
        );
        add_counter(
            &mut out,
            "dp_requests_processed_total",
            self.requests_processed_total.load(Ordering::Relaxed),
            "Requests marked processed",
        );
        add_counter(
            &mut out,
            "dp_router_errors_total",
            self.router_errors_total.load(Ordering::Relaxed),
            "Failed SAS request batches",
        );
        add_counter(
            &mut out,
            "dp_rc_relay_failures_total",
            self.rc_relay_failures_total.load(Ordering::Relaxed),
            "Failed Radio Controller relays",
        );

        add_counter(
            &mut out,
            "dp_sas_request_seconds_count",
            self.sas_request_count.load(Ordering::Relaxed),
            "Number of timed SAS calls",
        );
        let seconds =
            self.sas_request_micros_total.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        out.push_str("# HELP dp_sas_request_seconds_sum Total time spent in SAS calls\n");
        out.push_str("# TYPE dp_sas_request_seconds_sum counter\n");
        out.push_str(&format!("dp_sas_request_seconds_sum {:.6}\n", seconds));

        out
    }
}

fn add_counter(out: &mut String, name: &str, value: u64, help: &str) {
    out.push_str(&format!("# HELP {} {}\n", name, help));
    out.push_str(&format!("# TYPE {} counter\n", name));
    out.push_str(&format!("{} {}\n", name, value));
}

/// Metrics routes for the monitoring listener
pub fn router(metrics: Arc<PipelineMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<Arc<PipelineMetrics>>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.render(),
    )
        .into_response()
}
