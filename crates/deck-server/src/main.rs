//! logdeck - container log and resource dashboard backend
//!
//! Serves the LogDeck HTTP API over one or more container engine hosts.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use deck_engine::{CallContext, HostConfig};
use deck_fleet::{Fleet, HostPool};
use deck_metrics::StatsCache;
use deck_server::{LogDeckServer, ServerConfig, demo};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_FILTER: &str =
    "logdeck=info,deck_server=info,deck_fleet=info,deck_engine=info,tower_http=info";

#[derive(Parser)]
#[command(name = "logdeck")]
#[command(about = "Container log and resource dashboard backend")]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "LOGDECK_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Engine hosts as comma-separated name=url entries
    #[arg(long, env = "DOCKER_HOSTS", default_value = "local=local")]
    hosts: String,

    /// Deadline of list, stats and snapshot requests, in seconds
    #[arg(long, default_value_t = 10)]
    request_timeout_secs: u64,

    /// Timeout of individual engine requests, in seconds
    #[arg(long, default_value_t = 10)]
    engine_timeout_secs: u64,

    /// Allowed CORS origin (repeatable, all origins when omitted)
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,

    /// Serve seeded in-memory hosts instead of real engines
    #[arg(long)]
    demo: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let hosts = if cli.demo {
        demo::demo_hosts()
    } else {
        HostConfig::parse_list(&cli.hosts)?
    };

    let config = cli
        .cors_origins
        .iter()
        .fold(ServerConfig::new(cli.bind), |config, origin| {
            config.with_cors_origin(origin.clone())
        })
        .with_hosts(hosts)
        .with_request_timeout(Duration::from_secs(cli.request_timeout_secs))
        .with_engine_timeout(Duration::from_secs(cli.engine_timeout_secs));
    config.validate()?;

    let pool = if cli.demo {
        info!("starting in demo mode");
        demo::demo_pool()?
    } else {
        HostPool::connect(&config.hosts, config.engine_timeout)?
    };
    check_hosts(&pool, config.engine_timeout).await;

    let fleet = Fleet::new(pool, StatsCache::default());
    let server = LogDeckServer::new(config.clone(), fleet);

    server
        .serve_with_shutdown(config.bind_addr, shutdown_signal())
        .await?;
    Ok(())
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?;

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
    Ok(())
}

/// Pings every host once. Unreachable hosts are reported but kept.
async fn check_hosts(pool: &HostPool, timeout: Duration) {
    for (name, engine) in pool.iter() {
        let ctx = CallContext::new().with_timeout(timeout);
        match engine.ping(&ctx).await {
            Ok(()) => info!(host = %name, kind = engine.kind(), "host reachable"),
            Err(e) => warn!(host = %name, error = %e, "host unreachable at startup"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
}
