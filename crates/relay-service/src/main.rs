//! Relay Service: traced reverse-relay fixture for end-to-end tracing tests.
//!
//! Receives a request, optionally waits, calls the configured upstream inside
//! an exit span, and answers with the upstream's status and body.

mod config;
mod relay;
mod server;
mod workload;

use config::RelayConfig;
use relay_tracing::Tracer;
use server::AppState;

fn main() -> anyhow::Result<()> {
    // Determine config path
    let config_path = {
        let args: Vec<String> = std::env::args().collect();
        args.iter()
            .position(|a| a == "--config")
            .and_then(|i| args.get(i + 1).cloned())
            // Fall back to positional arg
            .or_else(|| args.get(1).filter(|a| !a.starts_with('-')).cloned())
            .or_else(|| std::env::var("RELAY_SERVICE_CONFIG").ok())
            .unwrap_or_else(|| "relay-service.toml".to_string())
    };

    // Load configuration
    let config = RelayConfig::load(&config_path)?;

    // The gRPC exporter needs a reactor, so the runtime comes before tracing
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let _tracing_guard = relay_tracing::init_tracing(&config.tracing);

        tracing::info!(
            config_path = %config_path,
            listen_address = %config.server.listen_address,
            upstream = %config.upstream.url,
            peers = ?config.upstream.peers,
            service = %config.tracing.service_name,
            "Starting relay-service"
        );

        run(config).await
    })
}

async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let tracer = Tracer::new(config.tracing.service_name.clone());
    let state = AppState::new(config, tracer)?;
    server::run(state).await
}
