//! fallwatch: live view and controls for the fall-detection camera appliance.
//!
//! ## Subcommands
//!
//! - `watch`: Mount a live monitoring session and stream its events
//! - `status`: Probe the appliance once
//! - `arm` / `disarm`: Send a single mode command
//! - `falls`: Print the appliance's fall log
//! - `clips`: List recorded clips

mod commands;
mod logging;
mod watch;

use clap::{Parser, Subcommand};
use fallwatch_core::{load_config, Mode, MonitorConfig, MonitorError};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "fallwatch")]
#[command(about = "Fall-detection camera monitor")]
#[command(version)]
struct Cli {
    /// Appliance base address (overrides the config file and FALLWATCH_APPLIANCE_URL)
    #[arg(long, global = true, value_name = "URL")]
    appliance_url: Option<String>,

    /// Config file (defaults to ~/.fallwatch/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Live session: prints status, mode, feed and fall events; reads arm/disarm/status/quit from stdin
    Watch,

    /// Probe the appliance once and print its status
    Status,

    /// Arm the system (detection on, live view off)
    Arm,

    /// Disarm the system (detection on, live view on)
    Disarm,

    /// Print the fall log
    Falls,

    /// List recorded clips with playable addresses
    Clips,
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run(cli));
    // A pending stdin read in `watch` would otherwise hold the runtime open.
    runtime.shutdown_timeout(Duration::from_millis(100));

    if let Err(e) = result {
        tracing::error!(error = %e, "fallwatch failed");
        eprintln!("fallwatch: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), MonitorError> {
    let config = resolve_config(cli.config, cli.appliance_url)?;

    match cli.command {
        Commands::Watch => watch::run(&config).await,
        Commands::Status => commands::status(&config).await,
        Commands::Arm => commands::set_mode(&config, Mode::Armed).await,
        Commands::Disarm => commands::set_mode(&config, Mode::Disarmed).await,
        Commands::Falls => commands::falls(&config).await,
        Commands::Clips => commands::clips(&config).await,
    }
}

fn resolve_config(
    path: Option<PathBuf>,
    appliance_url: Option<String>,
) -> Result<MonitorConfig, MonitorError> {
    let mut config = load_config(path)?;
    if let Some(url) = appliance_url {
        config.appliance_url = url;
        config.validate()?;
    }
    tracing::debug!(appliance = %config.appliance_url, "Configuration resolved");
    Ok(config)
}
