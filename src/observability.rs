use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total scheduling operations. Labels: op, status.
pub const OPS_TOTAL: &str = "caresched_ops_total";

/// Histogram: operation latency in seconds. Labels: op.
pub const OP_DURATION_SECONDS: &str = "caresched_op_duration_seconds";

/// Counter: scheduling conflicts detected by the conflict detector.
pub const CONFLICTS_TOTAL: &str = "caresched_conflicts_total";

/// Counter: store calls that hit the per-call timeout.
pub const STORE_TIMEOUTS_TOTAL: &str = "caresched_store_timeouts_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init_metrics(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Install the default fmt tracing subscriber. Embedding applications that
/// bring their own subscriber skip this.
pub fn init_tracing() {
    tracing_subscriber::fmt::init();
}
