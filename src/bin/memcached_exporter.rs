//! memcached_exporter - Prometheus exporter for memcached.
//!
//! Queries memcached on every scrape and serves the result on the telemetry
//! path. Nothing is cached between scrapes.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use prometheus::Registry;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

use memcached_exporter::VERSION;
use memcached_exporter::client::MemcachedClient;
use memcached_exporter::collector::Collector;
use memcached_exporter::config::{
    parse_duration, parse_listen_address, parse_telemetry_path, resolve_target,
};
use memcached_exporter::exporter::MemcachedExporter;
use memcached_exporter::web;

/// Prometheus exporter for memcached.
#[derive(Parser)]
#[command(name = "memcached_exporter", about = "Prometheus exporter for memcached", version = VERSION)]
struct Args {
    /// Memcached server address.
    #[arg(
        long = "memcached.address",
        default_value = "localhost:11211",
        env = "MEMCACHED_ADDRESS"
    )]
    address: String,

    /// memcached connect, read and write timeout (e.g. "1s", "500ms").
    #[arg(
        long = "memcached.timeout",
        default_value = "1s",
        env = "MEMCACHED_TIMEOUT",
        value_parser = parse_duration
    )]
    timeout: Duration,

    /// Optional path to a file containing the memcached PID for additional metrics.
    #[arg(long = "memcached.pid-file", env = "MEMCACHED_PID_FILE")]
    pid_file: Option<PathBuf>,

    /// Unix socket of memcached. Takes precedence over --memcached.address.
    #[arg(long = "memcached.unix-socket", env = "MEMCACHED_UNIX_SOCKET")]
    unix_socket: Option<PathBuf>,

    /// Address to listen on for web interface and telemetry.
    #[arg(
        long = "web.listen-address",
        default_value = ":9150",
        env = "WEB_LISTEN_ADDRESS",
        value_parser = parse_listen_address
    )]
    listen_address: String,

    /// Path under which to expose metrics.
    #[arg(
        long = "web.telemetry-path",
        default_value = "/metrics",
        env = "WEB_TELEMETRY_PATH",
        value_parser = parse_telemetry_path
    )]
    telemetry_path: String,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes logging based on verbosity level.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("memcached_exporter={}", level).parse::<Directive>() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    info!(version = VERSION, "starting memcached_exporter");

    let target = resolve_target(&args.address, args.unix_socket.clone(), args.timeout);
    info!(address = %target.address, timeout = ?target.timeout, "scraping memcached");

    // default registry: carries the exporter's own process metrics
    let registry = prometheus::default_registry().clone();

    let exporter = match MemcachedExporter::new(Collector::new(MemcachedClient::new(), target)) {
        Ok(exporter) => exporter,
        Err(e) => {
            error!(error = %e, "failed to build metric descriptors");
            process::exit(1);
        }
    };
    if let Err(e) = registry.register(Box::new(exporter)) {
        error!(error = %e, "failed to register memcached collector");
        process::exit(1);
    }

    if let Some(path) = &args.pid_file {
        register_process_collector(&registry, path.clone());
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(args.listen_address, args.telemetry_path, registry)) {
        error!(error = %e, "http server failed");
        process::exit(1);
    }
    info!("memcached_exporter stopped");
}

#[cfg(target_os = "linux")]
fn register_process_collector(registry: &Registry, path: PathBuf) {
    use memcached_exporter::process::PidFileCollector;

    info!(path = %path.display(), "collecting memcached process metrics");
    if let Err(e) = registry.register(Box::new(PidFileCollector::new(path))) {
        error!(error = %e, "failed to register process collector");
        process::exit(1);
    }
}

#[cfg(not(target_os = "linux"))]
fn register_process_collector(_registry: &Registry, path: PathBuf) {
    tracing::warn!(
        path = %path.display(),
        "process metrics are only supported on Linux, ignoring --memcached.pid-file"
    );
}

async fn serve(listen: String, telemetry_path: String, registry: Registry) -> std::io::Result<()> {
    let app = web::router(registry, &telemetry_path);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!(address = %listen, path = %telemetry_path, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutting down");
        })
        .await
}
