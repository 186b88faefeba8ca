use clap::Parser;
use ratewall_core::client_key::KeyMode;
use ratewall_core::config::{self, RateLimitConfig};
use ratewall_core::registry::BucketRegistry;
use ratewall_server::api::admission::Admission;
use ratewall_server::api::create_router;
use ratewall_server::api::handlers::AppState;
use ratewall_server::api::metrics;
use ratewall_server::sweeper;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ratewall", about = "Per-client token bucket admission control")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = config::DEFAULT_BIND)]
    bind: String,

    /// Sustained rate per client in requests per second (fractional allowed)
    #[arg(long, default_value_t = config::DEFAULT_LIMIT)]
    limit: f64,

    /// Burst capacity per client in requests
    #[arg(long, default_value_t = config::DEFAULT_BURST)]
    burst: u32,

    /// Client key derivation: "first-colon" (split peer address on first ':') or "ip"
    #[arg(long, default_value = "first-colon")]
    key_mode: KeyMode,

    /// Evict buckets idle for this many seconds (0 = keep every client forever)
    #[arg(long, default_value_t = config::DEFAULT_IDLE_TTL_SECS)]
    idle_ttl_secs: u64,

    /// Seconds between idle sweeps
    #[arg(long, default_value_t = config::DEFAULT_SWEEP_INTERVAL_SECS)]
    sweep_interval_secs: u64,

    /// Graceful shutdown timeout in seconds
    #[arg(long, default_value_t = config::DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    shutdown_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("ratewall_server=info".parse()?)
                .add_directive("ratewall_core=info".parse()?),
        )
        .init();

    let args = Args::parse();

    if args.port == 0 {
        eprintln!("Error: port must be > 0");
        std::process::exit(1);
    }
    let limits = RateLimitConfig::new(args.limit, args.burst);
    if let Err(e) = limits.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    if args.sweep_interval_secs == 0 {
        eprintln!("Error: sweep_interval_secs must be > 0");
        std::process::exit(1);
    }

    let registry = Arc::new(BucketRegistry::new(limits));
    let idle_ttl = Duration::from_secs(args.idle_ttl_secs);
    if args.idle_ttl_secs > 0 {
        if let Err(e) = sweeper::validate_idle_ttl(&registry, idle_ttl) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        tracing::info!(
            "Idle bucket eviction enabled (ttl {}s, sweep every {}s)",
            args.idle_ttl_secs,
            args.sweep_interval_secs
        );
        sweeper::spawn_idle_sweeper(
            registry.clone(),
            idle_ttl,
            Duration::from_secs(args.sweep_interval_secs),
        );
    }

    let prometheus_handle =
        metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    let admission = Admission::new(registry.clone(), args.key_mode);
    let state = AppState::new(admission, prometheus_handle);
    let app = create_router(state);

    let addr = format!("{}:{}", args.bind, args.port);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        limit = args.limit,
        burst = args.burst,
        key_mode = ?args.key_mode,
        idle_ttl_secs = args.idle_ttl_secs,
        "ratewall ready"
    );

    let metrics_registry = registry.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(config::METRICS_REFRESH_SECS));
        loop {
            interval.tick().await;
            metrics::update_registry_metrics(&metrics_registry);
        }
    });

    let shutdown_timeout = args.shutdown_timeout;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        wait_for_signal().await;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(shutdown_timeout)).await;
            tracing::error!(
                "Shutdown timeout ({}s) exceeded, exiting with requests in flight",
                shutdown_timeout
            );
            std::process::exit(1);
        });
    })
    .await?;

    tracing::info!(tracked_clients = registry.len(), "Server stopped");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    tracing::info!("Shutting down gracefully, draining in-flight requests...");
}
