//! lanbeam-relay binary.

use std::path::PathBuf;

use clap::Parser;
use lanbeam_config::validation;
use lanbeam_relay::{serve, RoomStore};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lanbeam-relay", about = "Rendezvous relay for lanbeam peers")]
struct Args {
    /// Config file path override.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file).
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides the config file).
    #[arg(long)]
    bind: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

/// Load the config, apply CLI overrides, bind and serve until the
/// process is stopped.
async fn run(args: Args) -> lanbeam_common::Result<()> {
    // An explicit --config must exist; only the default path is created.
    let mut config = lanbeam_config::load_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.relay.port = port;
    }
    if let Some(bind) = args.bind {
        config.relay.bind = bind;
    }
    validation::validate(&config)?;

    let addr = config.relay.listen_addr();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(room = %config.relay.room, "lanbeam-relay listening on {}", addr);

    serve(listener, RoomStore::new(), config.relay).await;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_directive = args.log_level.as_deref().unwrap_or("lanbeam_relay=info");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| log_directive.into()),
        )
        .init();

    if let Err(e) = run(args).await {
        tracing::error!(error = %e, "lanbeam-relay failed");
        std::process::exit(2);
    }
}
