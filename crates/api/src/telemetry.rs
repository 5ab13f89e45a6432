//! Tracing and metrics setup for the service binaries.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Config, LogFormat};
use crate::error::StartupError;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` directives filter events; an invalid directive falls back to
/// `info`.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Installs the global Prometheus recorder and returns its render handle.
pub fn install_metrics() -> Result<PrometheusHandle, StartupError> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}
