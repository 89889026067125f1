use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::core::config::Settings;

/// Installs the global subscriber. `RUST_LOG` wins over `EXAM_LOG_LEVEL`.
/// Output goes to stderr; stdout belongs to the exam console.
pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let telemetry = settings.telemetry();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&telemetry.log_level))
        .map_err(|err| anyhow::anyhow!("invalid log filter {:?}: {err}", telemetry.log_level))?;

    let output = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let output = if telemetry.json { output.json().boxed() } else { output.compact().boxed() };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;

    tracing::debug!(
        environment = settings.runtime().environment.as_str(),
        json = telemetry.json,
        "Tracing initialised"
    );
    Ok(())
}
