//! Command execution and event output.

use crate::{Commands, PowerState};
use avrlink_client::{Client, ClientEvent};
use avrlink_protocol::{Command, QUERY};
use colored::Colorize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

/// Maps a CLI command to the protocol command it sends.
///
/// Returns `None` for `watch`, which only listens.
pub fn to_command(cmd: &Commands) -> Result<Option<Command>, String> {
    let command = match cmd {
        Commands::Watch => return Ok(None),
        Commands::Power { state } => Command::SetMasterPower(*state == PowerState::On),
        Commands::Volume { fraction } => {
            if !fraction.is_finite() || !(0.0..=1.0).contains(fraction) {
                return Err(format!("volume must be between 0 and 1, got {}", fraction));
            }
            Command::SetMasterVolume(*fraction)
        }
        Commands::Play => Command::Play,
        Commands::Pause => Command::Pause,
        Commands::Next => Command::SkipNext,
        Commands::Previous => Command::SkipPrevious,
        Commands::Query { code } => {
            let code = code.trim().trim_end_matches(QUERY).to_ascii_uppercase();
            if code.is_empty() {
                return Err("query code must not be empty".to_string());
            }
            Command::query(code)
        }
        Commands::Send { raw } => Command::raw(raw.as_str()).map_err(|e| e.to_string())?,
    };
    Ok(Some(command))
}

/// Waits for the connection attempt to finish.
///
/// Prints the failure and returns false if it did not connect.
pub async fn wait_connected(events: &mut broadcast::Receiver<ClientEvent>, json: bool) -> bool {
    loop {
        match events.recv().await {
            Ok(ClientEvent::Connected) => {
                print_event(&ClientEvent::Connected, json);
                return true;
            }
            Ok(ClientEvent::Closed) | Err(RecvError::Closed) => return false,
            Ok(event) => print_event(&event, json),
            Err(RecvError::Lagged(_)) => {}
        }
    }
}

/// Streams events until the connection closes or Ctrl+C is pressed.
pub async fn watch(client: &Client, events: &mut broadcast::Receiver<ClientEvent>, json: bool) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ClientEvent::Closed) => {
                    print_event(&ClientEvent::Closed, json);
                    break;
                }
                Ok(event) => print_event(&event, json),
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("{}: {} events skipped", "Warning".yellow(), skipped);
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n{}", "Stopping watch...".dimmed());
                client.disconnect().await;
                break;
            }
        }
    }
}

/// Prints events for `period` or until the connection closes.
pub async fn settle(events: &mut broadcast::Receiver<ClientEvent>, period: Duration, json: bool) {
    let deadline = tokio::time::sleep(period);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            event = events.recv() => match event {
                Ok(ClientEvent::Closed) => {
                    print_event(&ClientEvent::Closed, json);
                    break;
                }
                Ok(event) => print_event(&event, json),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }
}

fn print_event(event: &ClientEvent, json: bool) {
    let line = if json {
        format_json(event)
    } else {
        format_event(event)
    };
    match event {
        ClientEvent::Errored(_) => eprintln!("{}", line),
        _ => println!("{}", line),
    }
}

/// Formats an event for terminal output.
pub fn format_event(event: &ClientEvent) -> String {
    match event {
        ClientEvent::Connected => "Connected".green().to_string(),
        ClientEvent::Closed => "Closed".dimmed().to_string(),
        ClientEvent::TimedOut => "Idle".yellow().to_string(),
        ClientEvent::Errored(e) => format!("{}: {}", "Error".red(), e),
        ClientEvent::Parsed(field, value) => format!("{} {}", field.name().cyan(), value),
        ClientEvent::Unrecognized(line) => format!("{}", line.dimmed()),
    }
}

/// Formats an event as one JSON object.
pub fn format_json(event: &ClientEvent) -> String {
    let value = match event {
        ClientEvent::Parsed(field, value) => json!({
            "event": event.name(),
            "field": field,
            "value": value,
        }),
        ClientEvent::Errored(e) => json!({ "event": event.name(), "error": e.to_string() }),
        ClientEvent::Unrecognized(line) => json!({ "event": event.name(), "line": line }),
        _ => json!({ "event": event.name() }),
    };
    value.to_string()
}
