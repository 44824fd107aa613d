//! ingestd: JSON telemetry ingestion server.
//!
//! ```bash
//! ingestd --port 8000 --base-dir /srv/ingestd
//! ingestd --config ingestd.toml --print-config
//! ```
//!
//! Settings come from `ingestd.toml` (or `--config`), then `INGESTD_*`
//! environment variables, then the flags below.

use anyhow::{bail, Context, Result};
use clap::Parser;
use ingestd_core::config::IngestdConfig;
use ingestd_core::logging::init_logging;
use ingestd_core::server::{run_with_retries, shutdown_signal};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ingestd",
    about = "Accepts JSON reports over HTTP and appends them to per-source logs",
    version
)]
struct Cli {
    /// Configuration file (defaults to ./ingestd.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to bind
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory holding downloads, the monitor directory and the PID file
    #[arg(long, value_name = "DIR")]
    base_dir: Option<String>,

    /// Log level: error, warn, info, debug or trace
    #[arg(long)]
    log_level: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn load_config(&self) -> Result<IngestdConfig> {
        let mut config = match &self.config {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                IngestdConfig::load_from(path)?
            }
            None => IngestdConfig::load()?,
        };

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.base_dir {
            config.server.base_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_logging(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run_with_retries(config, shutdown_signal()))?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
