//! ue-mcp-server: MCP server for AI-driven Unreal Editor automation
//!
//! Serves the editor tool set over MCP's HTTP transport at `/mcp`.

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::runtime::Runtime;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use ue_mcp_server::config::{self, Config};
use ue_mcp_server::error::ServerError;
use ue_mcp_server::mcp::{HttpServer, McpServer};
use ue_mcp_server::modules::{ActorModule, InMemoryActorModule};
use ue_mcp_server::tools::builtin_registry;

/// MCP server for AI-driven Unreal Editor automation.
///
/// Exposes editor operations (spawning, duplicating, deleting and listing
/// actors) as MCP tools over HTTP.
#[derive(Parser, Debug)]
#[command(name = "ue-mcp-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configuration file
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Waits for SIGINT or SIGTERM.
#[cfg(unix)]
async fn wait_for_shutdown() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
    }
    Ok(())
}

/// Waits for Ctrl+C.
#[cfg(windows)]
async fn wait_for_shutdown() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, initiating graceful shutdown");
    Ok(())
}

fn build_runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Runs `future` to completion, then shuts the runtime down.
///
/// Blocking tool calls still running after `shutdown_timeout` are left
/// behind instead of holding the process open.
fn block_on_bounded<F: Future>(runtime: Runtime, future: F, shutdown_timeout: Duration) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(shutdown_timeout);
    output
}

/// Builds modules, tools and server, then serves until a shutdown signal.
async fn run(cfg: &Config) -> Result<(), ServerError> {
    let actors: Arc<dyn ActorModule> = Arc::new(InMemoryActorModule::new());
    let registry = builtin_registry(&actors);
    info!(tools = registry.len(), "Tool registry ready");

    let server = Arc::new(McpServer::from_config(registry, &cfg.server));
    let mut http = HttpServer::from_config(server, &cfg.server)?;
    let addr = http.start().await?;

    info!(%addr, "MCP server ready, waiting for client connections...");

    let waited = wait_for_shutdown().await;
    http.stop().await;
    waited.map_err(ServerError::from)
}

/// Entry point for the ue-mcp-server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nExpected config at: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };

    if let Some(port) = args.port {
        cfg.server.port = port;
    }

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %cfg.server.bind_address,
        port = cfg.server.port,
        "Starting ue-mcp-server"
    );

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match block_on_bounded(runtime, run(&cfg), cfg.server.shutdown_timeout()) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
