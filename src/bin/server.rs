//! BGS Server Binary
//!
//! Starts the TCP server.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use bgs::network::Server;
use bgs::{Config, Directory};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// BGS Server
#[derive(Parser, Debug)]
#[command(name = "bgs-server")]
#[command(about = "Social network server over a binary protocol")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7777")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Word redacted from private messages (repeatable; replaces the defaults)
    #[arg(short, long = "filter")]
    filters: Vec<String>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,bgs=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("BGS Server v{}", bgs::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let mut builder = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections);
    if !args.filters.is_empty() {
        builder = builder.filtered_words(args.filters.iter().cloned());
    }
    let config = builder.build();

    let directory = Arc::new(Directory::new());
    tracing::info!("Directory initialized (today is {})", directory.today());

    let server = match Server::new(config, directory) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Ctrl+C stops the accept loop
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.store(true, Ordering::Release);
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
