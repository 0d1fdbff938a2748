//! # rewind-machine
//!
//! Gateway binary: loads settings, installs logging and metrics, and serves
//! the replay and streaming API until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rewind_server::RewindServer;
use rewind_settings::RewindSettings;

/// Local replay and streaming gateway for exchange market data.
#[derive(Parser, Debug)]
#[command(name = "rewind-machine", version, about)]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Root of the local data store (overrides settings).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Settings file. Defaults to `~/.rewind/settings.json`.
    #[arg(long, env = "TM_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long)]
    debug: bool,

    /// Log one JSON object per line.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn settings(&self) -> Result<RewindSettings> {
        let mut settings = match &self.config {
            Some(path) => rewind_settings::load_settings_from_path(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => rewind_settings::load_settings().context("failed to load settings")?,
        };
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(dir) = &self.data_dir {
            settings.data.data_dir.clone_from(dir);
        }
        if self.debug {
            settings.logging.level = "debug".into();
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;
    rewind_core::logging::init_subscriber(&settings.logging.level, cli.log_json);

    tracing::info!(
        version = rewind_core::constants::VERSION,
        data_dir = %settings.data.data_dir.display(),
        "starting rewind-machine"
    );

    let metrics = rewind_server::metrics::install_recorder()?;
    let server = RewindServer::from_settings(settings).with_metrics(metrics);
    let listener = server.bind().await?;
    let shutdown = server.shutdown();
    let handle = tokio::spawn(server.serve(listener));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutting down");
    shutdown.shutdown();

    handle.await.context("server task panicked")??;
    tracing::info!("shutdown complete");
    Ok(())
}
