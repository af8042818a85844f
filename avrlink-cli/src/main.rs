//! avrlink-cli - Command-line control of a networked AV receiver
//!
//! `watch` streams receiver events until Ctrl+C. Every other command
//! connects, sends one command, prints whatever the receiver reports during
//! the settle period and disconnects.

mod commands;

use avrlink_client::{Client, ConnectionConfig};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "avrlink-cli")]
#[command(about = "Control and monitor an AV receiver over its network control port")]
#[command(version)]
struct Cli {
    /// Receiver host name or address
    #[arg(short = 'H', long, env = "AVRLINK_HOST")]
    host: String,

    /// Receiver control port
    #[arg(short, long, env = "AVRLINK_PORT", default_value_t = avrlink_protocol::DEFAULT_PORT)]
    port: u16,

    /// Connect and idle timeout in milliseconds
    #[arg(short, long, default_value_t = 500)]
    timeout: u64,

    /// Metadata poll interval in milliseconds
    #[arg(long, default_value_t = 2500)]
    poll_interval: u64,

    /// Time to keep printing events after a one-shot command, in milliseconds
    #[arg(long, default_value_t = 1000)]
    settle: u64,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream receiver events until Ctrl+C
    Watch,

    /// Switch the main zone on or off
    Power {
        #[arg(value_enum)]
        state: PowerState,
    },

    /// Set the main zone volume
    Volume {
        /// Volume as a fraction of the receiver's maximum (0.0 - 1.0)
        fraction: f64,
    },

    /// Start network playback
    Play,

    /// Pause network playback
    Pause,

    /// Skip to the next track
    Next,

    /// Skip to the previous track
    Previous,

    /// Query the current value of a status code (e.g. PW, MV, Z2)
    Query {
        /// Status code
        code: String,
    },

    /// Send a raw protocol line
    Send {
        /// Line to send, without the trailing carriage return
        raw: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PowerState {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // Validate before touching the network
    let command = match commands::to_command(&cli.command) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(2);
        }
    };

    let config = ConnectionConfig::new(cli.host.clone(), cli.port)
        .with_connect_timeout(Duration::from_millis(cli.timeout))
        .with_poll_interval(Duration::from_millis(cli.poll_interval));

    let client = Client::new();
    let mut events = client.subscribe();

    tracing::debug!("Connecting to {}", config.addr());
    client.connect(config).await;

    if !commands::wait_connected(&mut events, cli.json).await {
        std::process::exit(1);
    }

    match command {
        None => commands::watch(&client, &mut events, cli.json).await,
        Some(command) => {
            if let Err(e) = client.send(command).await {
                eprintln!("{}: {}", "Error".red(), e);
                client.disconnect().await;
                std::process::exit(1);
            }
            let settle = Duration::from_millis(cli.settle);
            commands::settle(&mut events, settle, cli.json).await;
            client.disconnect().await;
        }
    }

    Ok(())
}
