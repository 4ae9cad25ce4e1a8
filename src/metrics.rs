use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::broadcast::PublishReport;

/// Install the Prometheus recorder
///
/// Fails if a recorder is already installed for this process.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    init_metric_descriptions();

    Ok(handle)
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!(
        "loghub_messages_received_total",
        "Messages received from the bus"
    );
    describe_counter!(
        "loghub_messages_dropped_total",
        "Messages dropped before storage or broadcast"
    );
    describe_counter!(
        "loghub_records_persisted_total",
        "Records written to topic tables"
    );
    describe_counter!(
        "loghub_persist_failures_total",
        "Records whose table creation or insert failed"
    );
    describe_counter!(
        "loghub_broadcast_deliveries_total",
        "Per-observer delivery attempts"
    );
    describe_gauge!("loghub_observers", "Currently attached live observers");
    describe_gauge!("loghub_info", "Build information");

    gauge!("loghub_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

pub fn record_received() {
    counter!("loghub_messages_received_total").increment(1);
}

/// `reason` is `invalid_topic` or `malformed`
pub fn record_dropped(reason: &'static str) {
    counter!("loghub_messages_dropped_total", "reason" => reason).increment(1);
}

pub fn record_persisted(topic: &str) {
    counter!("loghub_records_persisted_total", "topic" => topic.to_string()).increment(1);
}

pub fn record_persist_failure() {
    counter!("loghub_persist_failures_total").increment(1);
}

pub fn record_broadcast(report: &PublishReport) {
    counter!("loghub_broadcast_deliveries_total", "result" => "delivered").increment(report.delivered as u64);
    counter!("loghub_broadcast_deliveries_total", "result" => "lagging").increment(report.lagging as u64);
    counter!("loghub_broadcast_deliveries_total", "result" => "closed").increment(report.closed as u64);
}

pub fn set_observers(count: usize) {
    gauge!("loghub_observers").set(count as f64);
}
