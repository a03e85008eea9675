use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use ingest::{Coordinator, UpstreamArgs};
use server::{build_app, ServerConfig};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    #[command(flatten)]
    upstream: UpstreamArgs,
    /// Host to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    /// Per-query deadline
    #[arg(long, env = "QUERY_TIMEOUT_MS", default_value_t = 1_000)]
    query_timeout_ms: u64,
    /// Reload the full dataset on this interval; never when unset
    #[arg(long, env = "REFRESH_INTERVAL_SECS")]
    refresh_interval_secs: Option<u64>,
    /// Token required by POST /admin/refresh
    #[arg(long, env = "ADMIN_TOKEN")]
    admin_token: Option<String>,
    /// Comma-separated CORS origins
    #[arg(long, env = "CORS_ALLOW_ORIGIN")]
    cors_allow_origin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let coordinator = Arc::new(Coordinator::new(args.upstream.build_ingestor()?));
    coordinator.load_initial().await?;
    if let Some(secs) = args.refresh_interval_secs.filter(|s| *s > 0) {
        coordinator.spawn_periodic_refresh(Duration::from_secs(secs));
        tracing::info!(every_secs = secs, "periodic refresh enabled");
    }

    let config = ServerConfig {
        admin_token: args.admin_token,
        query_timeout: Duration::from_millis(args.query_timeout_ms),
        cors_allow_origin: args.cors_allow_origin,
    };
    let app = build_app(coordinator, config);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
