//! ---
//! vwb_section: "01-core-functionality"
//! vwb_subsection: "binary"
//! vwb_type: "source"
//! vwb_scope: "code"
//! vwb_description: "Binary entrypoint for the virtual wallbox daemon."
//! vwb_version: "v0.1.0"
//! vwb_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tokio::signal;
use tracing::info;
use vwb_api::{spawn_api_server, ApiState};
use vwb_common::config::AppConfig;
use vwb_common::logging::{init_tracing, LogFormat};
use vwb_metrics::{new_registry, spawn_http_server, SimulatorMetrics};
use vwb_sim::{DeviceStateStore, SeededSource, SimulatorRuntime};

const SERVICE_NAME: &str = "vwbd";
const DEFAULT_CONFIG: &str = "configs/vwb.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Virtual EV wallbox simulator",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "ADDR", help = "Override the API listen address")]
    listen: Option<SocketAddr>,

    #[arg(long, value_name = "SEED", help = "Seed the grid generator for reproducible readings")]
    seed: Option<u64>,

    #[arg(long, value_enum, help = "Override the stdout log format")]
    log_format: Option<CliLogFormat>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogFormat {
    Json,
    Pretty,
}

impl From<CliLogFormat> for LogFormat {
    fn from(value: CliLogFormat) -> Self {
        match value {
            CliLogFormat::Json => LogFormat::StructuredJson,
            CliLogFormat::Pretty => LogFormat::Pretty,
        }
    }
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!(
            "{SERVICE_NAME} {} ({} build)",
            env!("CARGO_PKG_VERSION"),
            build_profile()
        );
        return Ok(());
    }

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        if !path.exists() {
            bail!("configuration file {} does not exist", path.display());
        }
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from(DEFAULT_CONFIG));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;

    if let Some(listen) = cli.listen {
        config.api.listen = listen;
    }
    if let Some(seed) = cli.seed {
        config.simulation.random_seed = Some(seed);
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }
    init_tracing(SERVICE_NAME, &config.logging)?;

    match &loaded.source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => info!("no configuration file found; running with defaults"),
    }

    run_daemon(config).await
}

async fn run_daemon(config: AppConfig) -> Result<()> {
    let registry = new_registry();
    let simulator_metrics = SimulatorMetrics::new(&registry)?;

    let store = Arc::new(DeviceStateStore::initialize());
    let source = Box::new(SeededSource::from_config(config.simulation.random_seed));
    let simulators = SimulatorRuntime::new(config.simulation.clone())?
        .with_metrics(simulator_metrics)
        .start(Arc::clone(&store), source);

    let metrics_server = if config.metrics.enabled {
        Some(spawn_http_server(registry, config.metrics.listen)?)
    } else {
        info!("metrics exporter disabled by configuration");
        None
    };

    let api_server = spawn_api_server(Arc::new(ApiState::new(store)), config.api.listen)?;

    info!(api = %api_server.addr(), "daemon running; waiting for termination signal");
    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");

    api_server.shutdown().await?;
    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }
    simulators.shutdown().await?;

    Ok(())
}
