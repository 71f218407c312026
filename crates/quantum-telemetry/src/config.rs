//! Telemetry settings, read from the process environment.

use std::env;
use std::str::FromStr;

use crate::TelemetryError;

const DEFAULT_SERVICE: &str = "quantum-chain";
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

/// How log lines are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, coloured.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
    /// No console output; spans may still be exported.
    Off,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "off" | "none" => Ok(Self::Off),
            other => Err(TelemetryError::Config(format!("unknown log format '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,

    /// Appended to the service name when set, e.g. `quantum-chain-admission`.
    pub component: Option<String>,

    /// Tempo endpoint. `None` disables span export.
    pub otlp_endpoint: Option<String>,

    /// `EnvFilter` directive, e.g. `info,qc_admission=debug`.
    pub log_filter: String,

    pub log_format: LogFormat,

    /// Reported as `deployment.environment` on exported spans.
    pub network: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE.to_string(),
            component: None,
            otlp_endpoint: None,
            log_filter: "info".to_string(),
            log_format: LogFormat::Pretty,
            network: "testnet".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Read settings from the environment.
    ///
    /// - `OTEL_SERVICE_NAME` (default `quantum-chain`)
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: enables span export when set
    /// - `QC_OTLP_ENABLED=true` exports to `http://localhost:4317` without an endpoint
    /// - `QC_LOG_LEVEL`, then `RUST_LOG` (default `info`)
    /// - `QC_LOG_FORMAT`: `pretty`, `json` or `off`; defaults to `json` inside
    ///   containers. The older `QC_JSON_LOGS=true` is still honoured.
    /// - `QC_NETWORK` (default `testnet`)
    ///
    /// An unparseable `QC_LOG_FORMAT` falls back to the default format.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let in_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        let otlp_endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT").or_else(|| {
            lookup("QC_OTLP_ENABLED")
                .filter(|v| is_truthy(v))
                .map(|_| DEFAULT_OTLP_ENDPOINT.to_string())
        });

        let log_format = match lookup("QC_LOG_FORMAT") {
            Some(raw) => raw.parse().unwrap_or(defaults.log_format),
            None if lookup("QC_JSON_LOGS").is_some_and(|v| is_truthy(&v)) => LogFormat::Json,
            None if in_container => LogFormat::Json,
            None => defaults.log_format,
        };

        Self {
            service_name: lookup("OTEL_SERVICE_NAME").unwrap_or(defaults.service_name),
            component: None,
            otlp_endpoint,
            log_filter: lookup("QC_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_filter),
            log_format,
            network: lookup("QC_NETWORK").unwrap_or(defaults.network),
        }
    }

    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn full_service_name(&self) -> String {
        match &self.component {
            Some(component) => format!("{}-{}", self.service_name, component),
            None => self.service_name.clone(),
        }
    }

    pub fn exports_spans(&self) -> bool {
        self.otlp_endpoint.is_some()
    }
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}
