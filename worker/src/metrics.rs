//! Prometheus exporter for the notification metrics.
//!
//! ## Counters
//! - `notifications_created_total{type}`: persisted by the trigger service
//! - `notifications_sent_total{type}`: delivered by the dispatcher
//! - `notifications_failed_total{type, exhausted}`: failed attempts
//! - `notifications_deleted_total`: removed by the retention sweep
//!
//! ## Histograms
//! - `notifications_delivery_duration_seconds`: render and send time
//! - `worker_sweep_duration_seconds`: one full dispatcher sweep

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from starting the exporter.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to configure the exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install the recorder or bind the listener
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus scrape endpoint.
pub struct MetricsServer {
    addr: SocketAddr,
}

impl MetricsServer {
    /// Create a server that will listen on `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Register descriptions, install the recorder and start listening.
    ///
    /// Must be called from inside the Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if bucket configuration is rejected, a recorder is
    /// already installed, or the address cannot be bound.
    pub fn start(&self) -> Result<(), MetricsError> {
        register_metrics();

        PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .install()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        tracing::info!(addr = %self.addr, "Metrics available at http://{}/metrics", self.addr);
        Ok(())
    }
}

fn register_metrics() {
    describe_counter!(
        "notifications_created_total",
        "Notifications persisted, by type"
    );
    describe_counter!(
        "notifications_sent_total",
        "Notifications delivered, by type"
    );
    describe_counter!(
        "notifications_failed_total",
        "Failed delivery attempts, by type and whether retries are exhausted"
    );
    describe_counter!(
        "notifications_deleted_total",
        "Notifications removed by the retention sweep"
    );
    describe_histogram!(
        "notifications_delivery_duration_seconds",
        "Time taken to render and send one notification"
    );
    describe_histogram!(
        "worker_sweep_duration_seconds",
        "Time taken by one dispatcher sweep"
    );
}
