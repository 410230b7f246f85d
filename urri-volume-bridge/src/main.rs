use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use urri_volume::{AccessoryConfig, VolumeAccessory};

mod adapter;
mod commands;

use adapter::ConsoleAdapter;
use commands::Command;

/// URRI volume bridge
///
/// Exposes a URRI receiver as a dimmable light. Commands typed on stdin stand
/// in for the smart-home framework: `on`, `off`, `brightness <n>`, `status`,
/// `refresh`, `quit`.
#[derive(Parser, Debug)]
#[command(name = "urri-volume-bridge")]
#[command(about = "Expose a URRI receiver's volume as a dimmable light")]
#[command(version)]
pub struct Args {
    /// Accessory config file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Accessory name when no config file is given
    #[arg(short, long, default_value = "URRI Volume")]
    pub name: String,

    /// Receiver host name or IP address
    #[arg(short, long)]
    pub address: Option<String>,

    /// Volume applied when switched on from off
    #[arg(long)]
    pub default_volume: Option<u8>,

    /// Poll interval in milliseconds
    #[arg(long)]
    pub refresh_interval: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Resolve the accessory config from file, arguments and environment
    pub fn accessory_config(&self) -> Result<AccessoryConfig> {
        let mut config = match &self.config {
            Some(path) => AccessoryConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => AccessoryConfig::new(self.name.clone()),
        };

        if let Ok(address) = std::env::var("URRI_ADDRESS") {
            config.address = address;
        }
        if let Some(address) = &self.address {
            config.address = address.clone();
        }
        if let Some(volume) = self.default_volume {
            config.default_volume = volume;
        }
        if let Some(interval) = self.refresh_interval {
            config = config.with_refresh_interval(Duration::from_millis(interval));
        }

        config.validate().context("Invalid accessory configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    urri_volume::logging::init_logging_from_env(&args.log_level)
        .context("Failed to initialize logging")?;

    let config = args.accessory_config()?;
    let adapter = Arc::new(ConsoleAdapter::new(config.name.clone()));
    let accessory = VolumeAccessory::connect(config, adapter)
        .context("Failed to create accessory")?;

    let info = accessory.information();
    info!(
        name = %info.name,
        manufacturer = info.manufacturer,
        model = info.model,
        address = %accessory.config().address,
        "accessory ready"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => run_command(&accessory, command).await,
                    Ok(None) => {}
                    Err(e) => error!("{}", e),
                }
            }
        }
    }

    accessory.shutdown().await.context("Failed to stop poller")?;
    Ok(())
}

async fn run_command(accessory: &VolumeAccessory, command: Command) {
    let result = match command {
        Command::On => accessory.set_on(true).await,
        Command::Off => accessory.set_on(false).await,
        Command::Brightness(value) => accessory.set_brightness(value).await,
        Command::Status => {
            let on = accessory.get_on().await;
            let brightness = accessory.get_brightness();
            println!("on: {}, brightness: {}", on, brightness);
            Ok(())
        }
        Command::Refresh => {
            accessory.refresh();
            Ok(())
        }
        Command::Quit => Ok(()),
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
    }
}
