use metrics_exporter_prometheus::PrometheusBuilder;

use crate::core::config::Settings;

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    let Some(addr) = settings.telemetry().metrics_addr else {
        return Ok(());
    };

    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}

pub(crate) fn record_autosave(outcome: &'static str) {
    metrics::counter!("exam_autosave_total", "status" => outcome).increment(1);
}

pub(crate) fn record_submit(mode: &'static str, outcome: &'static str) {
    metrics::counter!("exam_submit_total", "mode" => mode, "status" => outcome).increment(1);
}

pub(crate) fn record_session_exit(reason: &'static str) {
    metrics::counter!("exam_sessions_total", "exit" => reason).increment(1);
}
