//! campus-kernel: front controller for a modular school site.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ dispatch::Dispatcher ──▶ routing::RouteTable
//!                         (axum)        (blocking pool,              │
//!                                        request deadline)          ▼
//!                                              │            controller::ControllerRegistry
//!                                              ▼                     │
//!     Client Response                   view::ViewRenderer ◀─────────┘
//!     ◀────────────── http::response ◀── (views, layouts, services from registry)
//!
//!     Startup: config ─▶ registry services ─▶ routing::RouteLoader discovery ─▶ listener
//! ```

mod app;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use campus_kernel::config::watcher::ConfigWatcher;
use campus_kernel::lifecycle::{signals, Shutdown};
use campus_kernel::observability::{logging, metrics};
use campus_kernel::{HttpServer, Kernel, KernelBuilder};

#[derive(Parser)]
#[command(name = "campus-kernel")]
#[command(about = "Front controller for a modular school site", long_about = None)]
struct Cli {
    /// Kernel configuration file.
    #[arg(short, long, global = true, default_value = "site/kernel.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover routes and serve the site
    Serve,
    /// Print the discovered route table
    Routes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let builder = KernelBuilder::from_file(&cli.config)?;
    logging::init(&builder.config().observability.log_level);
    tracing::info!(config = ?cli.config, "campus-kernel v0.1.0 starting");

    let kernel = Arc::new(app::install(builder).build()?);

    match cli.command {
        Commands::Serve => serve(kernel).await?,
        Commands::Routes => print_routes(&kernel),
    }
    Ok(())
}

async fn serve(kernel: Arc<Kernel>) -> Result<(), Box<dyn std::error::Error>> {
    let config = kernel.config();
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Dropping the watcher stops it, so it lives until the server returns.
    let _watcher = match (config.observability.watch_config, kernel.config_path()) {
        (true, Some(path)) => match ConfigWatcher::new(path, kernel.store().clone()).run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::error!(error = %e, "Failed to start config watcher");
                None
            }
        },
        _ => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let stopped = shutdown.signalled();
    signals::spawn_listener(shutdown);

    HttpServer::new(kernel.clone()).run(listener, stopped).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn print_routes(kernel: &Kernel) {
    println!("{:<7} {:<28} {:<28} MODULE", "METHOD", "PATH", "HANDLER");
    for route in kernel.routes().routes() {
        let origin = route
            .origin
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<7} {:<28} {:<28} {}",
            route.method.as_str(),
            format!("/{}", route.path),
            route.handler.describe(),
            origin
        );
    }
}
