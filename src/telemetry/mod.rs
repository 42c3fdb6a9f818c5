//! Telemetry module
//!
//! Structured logging with tracing. HTTP access logs come from the
//! `TraceLayer` installed by the server.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::TelemetryConfig;
use crate::error::{MockError, MockResult};

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured
/// level. A subscriber that is already installed is left in place.
pub fn init_telemetry(config: &TelemetryConfig) -> MockResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| MockError::config(format!("Invalid log level: {}", e), "telemetry.log_level"))?;

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let installed = if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_target(true);

        subscriber.with(json_layer).try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_file(false)
            .with_line_number(false)
            .with_target(true)
            .compact();

        subscriber.with(fmt_layer).try_init()
    };

    if installed.is_ok() {
        tracing::info!(
            service = %config.service_name,
            version = %crate::VERSION,
            "Telemetry initialized"
        );
    }

    Ok(())
}
