//! Global subscriber: env filter, console layer per [`LogFormat`], and an
//! optional OpenTelemetry layer exporting spans to Tempo.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{self, RandomIdGenerator, Sampler, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::LogFormat;
use crate::{TelemetryConfig, TelemetryError};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Flushes and shuts down the span exporter on drop.
pub struct TracingGuard {
    provider: Option<TracerProvider>,
}

impl TracingGuard {
    pub fn exporting(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            // The subscriber may already be gone; stderr is all that is left.
            if let Err(e) = provider.shutdown() {
                eprintln!("Span exporter shutdown failed: {e:?}");
            }
        }
    }
}

fn span_exporter(config: &TelemetryConfig, endpoint: &str) -> Result<TracerProvider, TelemetryError> {
    let resource = Resource::new([
        KeyValue::new("service.name", config.full_service_name()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        KeyValue::new("deployment.environment", config.network.clone()),
    ]);

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint))
        .with_trace_config(
            trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .install_batch(runtime::Tokio)
        .map_err(|e| TelemetryError::TracerInit(e.to_string()))
}

fn console_layer(format: LogFormat) -> Option<BoxedLayer> {
    match format {
        LogFormat::Pretty => Some(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_ansi(true)
                .boxed(),
        ),
        LogFormat::Json => Some(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        ),
        LogFormat::Off => None,
    }
}

/// Install the global subscriber. Span export needs a running Tokio
/// runtime, hence `async`.
pub async fn init_tracing(config: &TelemetryConfig) -> Result<TracingGuard, TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .map_err(|e| TelemetryError::Config(format!("log filter '{}': {e}", config.log_filter)))?;

    let provider = config
        .otlp_endpoint
        .as_deref()
        .map(|endpoint| span_exporter(config, endpoint))
        .transpose()?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if let Some(console) = console_layer(config.log_format) {
        layers.push(console);
    }
    if let Some(provider) = &provider {
        let tracer = provider.tracer(config.full_service_name());
        layers.push(tracing_opentelemetry::layer().with_tracer(tracer).boxed());
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

    tracing::info!(
        service = %config.full_service_name(),
        format = ?config.log_format,
        otlp_endpoint = config.otlp_endpoint.as_deref().unwrap_or("disabled"),
        "Telemetry initialized"
    );

    Ok(TracingGuard { provider })
}
