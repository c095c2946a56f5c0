//! Reporter setup and TracingGuard.

use anyhow::Result;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{Reporter, TracingConfig};

/// RAII guard that flushes and shuts down the tracer provider on drop.
pub struct TracingGuard {
    provider: SdkTracerProvider,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Err(e) = self.provider.shutdown() {
            eprintln!("Failed to shutdown tracer provider: {e}");
        }
    }
}

/// Initialize the tracing subsystem.
///
/// Spans always flow through an OpenTelemetry tracer so that trace ids exist
/// and can be propagated downstream. What happens to completed spans depends
/// on [`TracingConfig::reporter`]:
///
/// - [`Reporter::Log`]: each span is logged to stderr when it closes.
/// - [`Reporter::Grpc`] / [`Reporter::Http`]: spans are batched to the OTLP
///   collector at `collector_endpoint`.
///
/// If the OTLP exporter fails to build, falls back to the log reporter so the
/// service still starts without a collector.
///
/// Must be called from within a tokio runtime when the gRPC reporter is used.
pub fn init_tracing(config: &TracingConfig) -> TracingGuard {
    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (provider, exporting, fallback_error) = match config.reporter {
        Reporter::Log => (local_provider(config), false, None),
        Reporter::Grpc | Reporter::Http => match exporting_provider(config) {
            Ok(provider) => (provider, true, None),
            Err(e) => (local_provider(config), false, Some(e)),
        },
    };

    let tracer = provider.tracer(config.service_name.clone());

    // Without an exporter the log is the only place spans end up
    let span_events = if exporting {
        FmtSpan::NONE
    } else {
        FmtSpan::CLOSE
    };

    tracing_subscriber::registry()
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_span_events(span_events)
                .with_writer(std::io::stderr),
        )
        .with(env_filter)
        .init();

    match fallback_error {
        Some(e) => tracing::warn!(
            error = %e,
            endpoint = %config.collector_endpoint,
            "OTLP exporter failed to initialize, reporting spans to the log"
        ),
        None => tracing::info!(
            service = %config.service_name,
            reporter = ?config.reporter,
            endpoint = %config.collector_endpoint,
            "Tracing initialized"
        ),
    }

    TracingGuard { provider }
}

fn resource(config: &TracingConfig) -> Resource {
    Resource::builder_empty()
        .with_service_name(config.service_name.clone())
        .build()
}

/// Provider with no exporter: spans get real ids but are only seen by the fmt layer.
fn local_provider(config: &TracingConfig) -> SdkTracerProvider {
    SdkTracerProvider::builder()
        .with_resource(resource(config))
        .build()
}

/// Provider with a batching OTLP exporter. Returns Err if the exporter cannot
/// be built.
fn exporting_provider(config: &TracingConfig) -> Result<SdkTracerProvider> {
    let endpoint = config.collector_endpoint.as_str();
    let exporter = match config.reporter {
        Reporter::Http => opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()?,
        _ => opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?,
    };

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource(config))
        .build())
}
