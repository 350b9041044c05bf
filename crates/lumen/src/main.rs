//! Lumen - adaptive-rate Art-Net output
//!
//! # Usage
//!
//! ```bash
//! # Broadcast four universes using the defaults
//! lumen run
//!
//! # Use a config file and run without a network transport
//! lumen --config lumen.toml run --simulate
//!
//! # Show the packet that would be sent for universe 2
//! lumen packet --universe 2 --set 1=255 --set 3=128
//!
//! # Print the effective configuration
//! lumen config
//! ```

#![warn(missing_docs)]

mod logging_setup;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lumen_control::{encode_dmx, ConfiguredInterface, DmxEngine};
use lumen_core::{clamp_dmx, OutputConfig, DMX_CHANNELS};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Lumen - adaptive-rate Art-Net lighting output
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(version)]
#[command(about = "Adaptive-rate Art-Net DMX output engine")]
#[command(long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the output engine and run until Ctrl-C
    Run {
        /// Override the number of universes
        #[arg(short, long)]
        universes: Option<u16>,

        /// Run without sending packets
        #[arg(short, long)]
        simulate: bool,

        /// Seconds between status reports at debug level, 0 disables them
        #[arg(long, default_value_t = 10)]
        status_interval: u64,
    },
    /// Print the Art-Net packet for a universe as hex
    Packet {
        /// Universe number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        universe: u16,

        /// Channel assignment as CHANNEL=VALUE (repeatable)
        #[arg(long = "set", value_name = "CH=VAL", value_parser = parse_assignment)]
        assignments: Vec<(u16, i32)>,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = OutputConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Run {
            universes,
            simulate,
            status_interval,
        } => {
            let mut config = config;
            if let Some(count) = universes {
                config.universe_count = count;
            }
            if simulate {
                config.artnet_enabled = false;
            }
            config.validate()?;

            let _log_guard = logging_setup::init(&config.logging)?;

            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(run(config, status_interval))
        }
        Command::Packet {
            universe,
            assignments,
        } => {
            let packet = build_packet(universe, &assignments)?;
            print!("{}", hex_dump(&packet));
            Ok(())
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

async fn run(config: OutputConfig, status_interval: u64) -> Result<()> {
    info!("==========================================");
    info!("===        Lumen Output Started        ===");
    info!("==========================================");

    let selector = ConfiguredInterface::from(&config);
    let engine = Arc::new(DmxEngine::new(config)?);
    engine.start(&selector)?;

    let status = engine.get_transmission_status();
    info!(
        universes = engine.universe_count(),
        destination = status.destination.as_deref().unwrap_or("simulation"),
        "DMX output running, press Ctrl-C to stop"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let period = Duration::from_secs(status_interval.max(1));
    let mut ticker = tokio::time::interval(period);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
            _ = ticker.tick(), if status_interval > 0 => {
                let status = engine.get_transmission_status();
                debug!(status = %status.to_json()?, "Transmission status");
            }
        }
    }

    info!("Shutting down, sending blackout");
    engine.stop().await;
    let status = engine.get_transmission_status();
    info!(
        packets_sent = status.packets_sent,
        send_errors = status.send_errors,
        "DMX output stopped"
    );
    Ok(())
}

/// Parse `CHANNEL=VALUE`
fn parse_assignment(raw: &str) -> std::result::Result<(u16, i32), String> {
    let (channel, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CHANNEL=VALUE, got '{}'", raw))?;
    let channel: u16 = channel
        .trim()
        .parse()
        .map_err(|e| format!("invalid channel '{}': {}", channel, e))?;
    let value: i32 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value '{}': {}", value, e))?;
    Ok((channel, value))
}

fn build_packet(universe: u16, assignments: &[(u16, i32)]) -> Result<Vec<u8>> {
    if universe == 0 {
        bail!("Universe numbers start at 1");
    }

    let mut channels = [0u8; DMX_CHANNELS];
    for &(channel, value) in assignments {
        if channel == 0 || channel as usize > DMX_CHANNELS {
            bail!("Channel {} is outside 1..={}", channel, DMX_CHANNELS);
        }
        channels[channel as usize - 1] = clamp_dmx(value);
    }

    Ok(encode_dmx(universe, &channels).to_vec())
}

/// Rows of 16 bytes prefixed with their offset
fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let encoded = hex::encode(chunk);
        let pairs: Vec<&str> = (0..encoded.len())
            .step_by(2)
            .map(|i| &encoded[i..i + 2])
            .collect();
        out.push_str(&format!("{:04x}  {}\n", row * 16, pairs.join(" ")));
    }
    out
}
