//! Logging and OpenTelemetry export for the operator
//!
//! Logs are JSON lines on stdout. When an OTLP endpoint is configured,
//! spans and the instruments in [`crate::metrics`] are pushed to it over
//! gRPC as well; otherwise both stay local.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Tracer, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Service name reported with every span and metric
pub const OPERATOR_SERVICE: &str = "yaks-operator";

/// Log filter used when none is configured
pub const DEFAULT_LOG_FILTER: &str = "info,yaks=debug,kube=info";

/// Telemetry setup failure
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter directive could not be parsed
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Directive as given
        filter: String,
        /// Parser message
        message: String,
    },

    /// An OTLP exporter could not be built
    #[error("failed to build OTLP {signal} exporter: {message}")]
    Exporter {
        /// `traces` or `metrics`
        signal: &'static str,
        /// Exporter message
        message: String,
    },

    /// A global subscriber was already installed
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

/// Telemetry settings taken from the operator's command line
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// OTLP gRPC endpoint, e.g. `http://otel-collector:4317`
    pub otlp_endpoint: Option<String>,
    /// `EnvFilter` directive, [`DEFAULT_LOG_FILTER`] when unset
    pub log_filter: Option<String>,
}

impl TelemetryConfig {
    /// Endpoint to export to, ignoring a blank value
    pub fn endpoint(&self) -> Option<&str> {
        self.otlp_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
    }

    fn filter(&self) -> Result<EnvFilter, TelemetryError> {
        let directive = self
            .log_filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_LOG_FILTER);
        EnvFilter::try_new(directive).map_err(|e| TelemetryError::Filter {
            filter: directive.to_string(),
            message: e.to_string(),
        })
    }
}

/// Install the global subscriber, and the OTLP pipeline when configured
///
/// Call once, inside the Tokio runtime: the OTLP batch exporters spawn
/// onto it.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = config.filter()?;
    let otel_layer = match config.endpoint() {
        Some(endpoint) => {
            let tracer = install_otlp(endpoint)?;
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    let json = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(otel_layer)
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))
}

fn operator_resource() -> Resource {
    let mut attributes = vec![
        KeyValue::new(SERVICE_NAME, OPERATOR_SERVICE),
        KeyValue::new(SERVICE_VERSION, crate::CONTROLLER_VERSION),
    ];
    if let Ok(pod) = std::env::var("POD_NAME") {
        attributes.push(KeyValue::new("k8s.pod.name", pod));
    }
    Resource::new(attributes)
}

/// Register global trace and meter providers exporting to `endpoint`
fn install_otlp(endpoint: &str) -> Result<Tracer, TelemetryError> {
    global::set_text_map_propagator(TraceContextPropagator::new());
    let resource = operator_resource();

    let spans = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| exporter_error("traces", e))?;
    let tracer_provider = TracerProvider::builder()
        .with_batch_exporter(spans, runtime::Tokio)
        .with_resource(resource.clone())
        .build();
    let tracer = tracer_provider.tracer(OPERATOR_SERVICE);
    global::set_tracer_provider(tracer_provider);

    let metrics = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| exporter_error("metrics", e))?;
    let reader = PeriodicReader::builder(metrics, runtime::Tokio).build();
    global::set_meter_provider(
        SdkMeterProvider::builder()
            .with_reader(reader)
            .with_resource(resource)
            .build(),
    );

    Ok(tracer)
}

fn exporter_error(signal: &'static str, e: impl std::fmt::Display) -> TelemetryError {
    TelemetryError::Exporter {
        signal,
        message: e.to_string(),
    }
}
