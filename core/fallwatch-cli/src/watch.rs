//! `fallwatch watch`: a terminal live view.
//!
//! The terminal has no video surface, so a feed load is reported as loaded as
//! soon as its address is printed.

use fallwatch_core::{
    activate, HttpApplianceTransport, LocalOperator, Mode, MonitorConfig, MonitorError,
    SessionHandle, Severity, ViewEvent,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Toggle(Mode),
    Status,
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    match line.trim().to_ascii_lowercase().as_str() {
        "arm" => Some(Input::Toggle(Mode::Armed)),
        "disarm" => Some(Input::Toggle(Mode::Disarmed)),
        "status" => Some(Input::Status),
        "quit" | "exit" | "q" => Some(Input::Quit),
        _ => None,
    }
}

pub async fn run(config: &MonitorConfig) -> Result<(), MonitorError> {
    let transport =
        HttpApplianceTransport::new(config.appliance_base()?, config.request_timeout())?;
    let identity = LocalOperator::from_config(&config.identity);
    let (session, mut events) = activate(config, Arc::new(transport), &identity)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if let Err(err) = render(&session, event) {
                        break Err(err);
                    }
                }
                None => break Ok(()),
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_input(&line) {
                    Some(Input::Toggle(mode)) => {
                        if let Err(err) = session.toggle(mode) {
                            break Err(err);
                        }
                    }
                    Some(Input::Status) => match session.snapshot().await {
                        Ok(snapshot) => match serde_json::to_string_pretty(&snapshot) {
                            Ok(json) => println!("{}", json),
                            Err(err) => tracing::warn!(error = %err, "Failed to encode snapshot"),
                        },
                        Err(err) => break Err(err),
                    },
                    Some(Input::Quit) => break Ok(()),
                    None if line.trim().is_empty() => {}
                    None => eprintln!("Unknown command {:?}; try arm, disarm, status or quit", line.trim()),
                },
                Ok(None) => stdin_open = false,
                Err(err) => {
                    tracing::warn!(error = %err, "Stopped reading stdin");
                    stdin_open = false;
                }
            },
            _ = &mut ctrl_c => break Ok(()),
        }
    };

    session.shutdown().await;
    outcome
}

fn render(session: &SessionHandle, event: ViewEvent) -> Result<(), MonitorError> {
    match event {
        ViewEvent::Status(status) => println!("[status] {}", status),
        ViewEvent::Mode { mode, visibility } => {
            let feed = if visibility.is_live() { "live" } else { "hidden" };
            println!("[mode] {} (feed {})", mode, feed);
        }
        ViewEvent::ToggleSettled(result) => tracing::debug!(?result, "Mode toggle settled"),
        ViewEvent::LoadFeed(load) => {
            println!("[feed] {}", load.url);
            session.feed_loaded(load.generation)?;
        }
        ViewEvent::RevealFeed(generation) => {
            tracing::debug!(generation = generation.value(), "Feed revealed");
        }
        ViewEvent::Falls(summary) => match summary.latest_timestamp {
            Some(latest) => println!("[falls] {} total, latest at {}", summary.count, latest),
            None => println!("[falls] {} total", summary.count),
        },
        ViewEvent::Notice(notice) => {
            let tag = match notice.severity {
                Severity::Info => "info",
                Severity::Alert => "ALERT",
                Severity::Error => "error",
            };
            println!("[{}] {}: {}", tag, notice.title, notice.body);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_commands() {
        assert_eq!(parse_input("arm"), Some(Input::Toggle(Mode::Armed)));
        assert_eq!(parse_input("  DISARM\n"), Some(Input::Toggle(Mode::Disarmed)));
        assert_eq!(parse_input("status"), Some(Input::Status));
        assert_eq!(parse_input("q"), Some(Input::Quit));
        assert_eq!(parse_input("reboot"), None);
    }
}
