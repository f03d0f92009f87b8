//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): relayed requests by operation, status
//! - `gateway_request_duration_seconds` (histogram): handler latency by operation

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::StatusCode;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::relay::Operation;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished relay.
pub fn record_request(operation: Operation, status: StatusCode, start: Instant) {
    let operation = operation.as_str();
    metrics::counter!(
        "gateway_requests_total",
        "operation" => operation,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!(
        "gateway_request_duration_seconds",
        "operation" => operation
    )
    .record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_request_emits_counter_and_histogram() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_request(Operation::Answer, StatusCode::OK, Instant::now());
            record_request(Operation::Answer, StatusCode::OK, Instant::now());
            record_request(Operation::Reset, StatusCode::BAD_GATEWAY, Instant::now());
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"gateway_requests_total{operation="answer",status="200"} 2"#));
        assert!(rendered.contains(r#"gateway_requests_total{operation="reset",status="502"} 1"#));
        assert!(rendered.contains("gateway_request_duration_seconds"));
    }
}
