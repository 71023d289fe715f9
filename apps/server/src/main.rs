//! ramstash server entry point.

mod config;

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use ramstash_server::TransferServer;
use ramstash_store::FileStore;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(version, about = "In-memory file transfer server")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting ramstash server"
    );

    let mut config = config::Config::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    tracing::info!(bind = %config.bind, port = config.port, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config))?;

    tracing::info!("server shut down cleanly");
    Ok(())
}

/// Serves until Ctrl-C.
async fn run(config: config::Config) -> anyhow::Result<()> {
    let server = TransferServer::new(config.to_server_config(), FileStore::new());
    tracing::debug!(
        max_header_size = server.config().max_header_size,
        max_upload_size = server.config().max_upload_size,
        "transfer limits"
    );

    let signal_server = std::sync::Arc::clone(&server);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            signal_server.shutdown();
        }
    });

    server.run().await?;
    tracing::info!(
        files = server.store().len(),
        bytes = server.store().total_bytes(),
        "discarding stored files"
    );
    Ok(())
}
