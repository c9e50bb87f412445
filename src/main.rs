//! Binary entry: wire config, collector, registry, and the exposition server.

use std::net::SocketAddr;

use anyhow::Result;
use prometheus::Registry;
use tracing::info;
use tracing_subscriber::EnvFilter;

use upstat_exporter::collector::UpstreamCollector;
use upstat_exporter::config::Config;
use upstat_exporter::server::router;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::load();

    // The collector carries a blocking HTTP client, so it must be built
    // before entering the runtime; tokio rejects blocking-client setup from
    // an async context.
    let collector = UpstreamCollector::new(&cfg.namespace, cfg.upstream_url.clone(), cfg.timeout)?;
    let registry = Registry::new();
    registry.register(Box::new(collector))?;

    info!(
        upstream = %cfg.upstream_url,
        namespace = %cfg.namespace,
        "starting exporter on port {}", cfg.port
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(cfg.port, registry))
}

async fn serve(port: u16, registry: Registry) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("exposition endpoint ready at http://{}/metrics", addr);
    axum::serve(listener, router(registry)).await?;
    Ok(())
}
