use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }
    if PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    metrics::describe_counter!("attempts_started_total", "Attempts created by a start request");
    metrics::describe_counter!(
        "attempts_resumed_total",
        "Start requests answered with an existing live attempt"
    );
    metrics::describe_counter!("attempts_finalized_total", "Attempts moved to completed, by trigger");
    metrics::describe_counter!(
        "attempt_finalize_conflicts_total",
        "Finalize calls that found the attempt already submitted"
    );
    metrics::describe_counter!("attempt_answers_saved_total", "Answer upserts accepted");
    metrics::describe_counter!(
        "expired_attempts_swept_total",
        "Expired attempts finalized by the background sweep"
    );
    metrics::describe_counter!("http_requests_total", "HTTP responses by status code");
}
