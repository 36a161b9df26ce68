//! OpenTelemetry instrumentation for the runner.

use anyhow::Result;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_SERVICE_NAME: &str = "ember-runner";

pub fn init_telemetry(otel_endpoint: Option<&str>) -> Result<()> {
    // Standard OTEL environment variable wins over the config file
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .ok()
        .or_else(|| otel_endpoint.map(|s| s.to_string()));

    let tracer_provider = if let Some(endpoint) = &endpoint {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?;

        TracerProvider::builder()
            .with_batch_exporter(exporter, runtime::Tokio)
            .with_sampler(Sampler::AlwaysOn)
            .with_id_generator(RandomIdGenerator::default())
            .with_resource(Resource::new(vec![
                KeyValue::new(
                    SERVICE_NAME,
                    std::env::var("OTEL_SERVICE_NAME")
                        .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string()),
                ),
                KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
            ]))
            .build()
    } else {
        TracerProvider::builder()
            .with_sampler(Sampler::AlwaysOff)
            .build()
    };

    global::set_tracer_provider(tracer_provider.clone());
    let tracer = tracer_provider.tracer(DEFAULT_SERVICE_NAME);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ember_runner=debug,ember_world=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .init();

    match endpoint {
        Some(endpoint) => info!("Exporting traces to OTLP endpoint: {}", endpoint),
        None => info!("OpenTelemetry disabled (no endpoint configured)"),
    }
    Ok(())
}

pub fn shutdown_telemetry() {
    info!("Shutting down telemetry");
    global::shutdown_tracer_provider();
}
