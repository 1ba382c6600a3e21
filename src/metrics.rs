use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("uplink_fetch_total", "Feed fetches started, per domain.");
        describe_counter!(
            "uplink_fetch_failures_total",
            "Feed fetches that failed after retries, per domain and error kind."
        );
        describe_counter!("uplink_records_total", "Records parsed from feed answers.");
        describe_histogram!(
            "uplink_fetch_ms",
            "Wall time of one feed fetch including backoff, in milliseconds."
        );
        describe_counter!("uplink_retries_total", "Backoff retries after quota refusals.");
        describe_counter!(
            "uplink_stale_responses_total",
            "Feed responses discarded because a newer request superseded them."
        );
        describe_counter!("chat_tool_calls_total", "Local tool invocations requested by the chat model.");
    });
}

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder. Later calls reuse the first handle.
    pub fn init() -> anyhow::Result<Self> {
        static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();
        let handle = HANDLE
            .get_or_try_init(|| PrometheusBuilder::new().install_recorder())?
            .clone();
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
