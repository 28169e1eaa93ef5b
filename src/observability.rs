use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: booking submissions. Labels: outcome (`committed` or an error label).
pub const SUBMISSIONS_TOTAL: &str = "fleetbook_submissions_total";

/// Histogram: end-to-end submit latency in seconds.
pub const SUBMIT_DURATION_SECONDS: &str = "fleetbook_submit_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: time spent waiting for a category commit lock, in seconds.
pub const LOCK_WAIT_SECONDS: &str = "fleetbook_lock_wait_seconds";

/// Counter: commit lock waits that hit the timeout.
pub const LOCK_TIMEOUTS_TOTAL: &str = "fleetbook_lock_timeouts_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "fleetbook_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (reservations per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "fleetbook_wal_flush_batch_size";

/// Counter: WAL batches that failed to flush and were rolled back.
pub const WAL_FLUSH_FAILURES_TOTAL: &str = "fleetbook_wal_flush_failures_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
