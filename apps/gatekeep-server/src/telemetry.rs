//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Directives used when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVES: &str = "info,gatekeep_server=debug,gatekeep_infra=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, for local runs.
    #[default]
    Pretty,
    /// One JSON object per event, for log shippers.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub format: LogFormat,
    /// Reported on startup so aggregated logs can be told apart.
    pub service_name: String,
}

impl TelemetryConfig {
    /// `LOG_FORMAT` (`json` or anything else for pretty) and `SERVICE_NAME`.
    pub fn from_env() -> Self {
        Self {
            format: std::env::var("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| env!("CARGO_PKG_NAME").to_string()),
        }
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_telemetry(config: &TelemetryConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
    }

    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        "Telemetry initialized"
    );
}
