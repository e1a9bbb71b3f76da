//! Shared value types for the monitoring session.

use fallwatch_protocol::FallEvent;
use serde::Serialize;
use std::fmt;

/// Reachability of the appliance as seen by this client.
///
/// `Connecting` is only ever the initial value; once the first probe resolves
/// the status moves between `Connected` and `Disconnected` for the rest of the
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connecting => write!(f, "Connecting..."),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Appliance operating mode. Armed keeps detection running but stops live
/// frames from being delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Armed,
    Disarmed,
}

impl Mode {
    pub fn from_armed(armed: bool) -> Self {
        if armed {
            Mode::Armed
        } else {
            Mode::Disarmed
        }
    }

    pub fn is_armed(self) -> bool {
        matches!(self, Mode::Armed)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Armed => write!(f, "Armed"),
            Mode::Disarmed => write!(f, "Disarmed"),
        }
    }
}

/// Whether the view should show the live feed or the "monitoring, feed hidden"
/// placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedVisibility {
    Live,
    Suppressed,
}

impl FeedVisibility {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Armed => FeedVisibility::Suppressed,
            Mode::Disarmed => FeedVisibility::Live,
        }
    }

    pub fn is_live(self) -> bool {
        matches!(self, FeedVisibility::Live)
    }
}

/// How prominently a [`Notice`] is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Routine confirmation (connected, mode changed).
    Info,
    /// A detected fall.
    Alert,
    /// A failure the user should know about, such as a rejected mode change.
    Error,
}

/// A non-blocking, user-visible message. Fall alerts, rejected mode changes
/// and routine confirmations all share this channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub body: String,
}

impl Notice {
    fn new(severity: Severity, title: &str, body: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.to_string(),
            body: body.into(),
        }
    }

    pub fn fall_detected(event: &FallEvent) -> Self {
        Notice::new(
            Severity::Alert,
            "Fall Detected!",
            format!("A fall was detected at {}", event.timestamp),
        )
    }

    pub fn mode_confirmed(mode: Mode) -> Self {
        match mode {
            Mode::Armed => Notice::new(
                Severity::Info,
                "System Armed",
                "Fall detection active. Live view hidden to save bandwidth.",
            ),
            Mode::Disarmed => Notice::new(
                Severity::Info,
                "System Disarmed",
                "Fall detection active with live view enabled.",
            ),
        }
    }

    pub fn mode_rejected() -> Self {
        Notice::new(
            Severity::Error,
            "Error",
            "Failed to change system mode. Please try again.",
        )
    }

    pub fn connected() -> Self {
        Notice::new(
            Severity::Info,
            "Connected to Camera System",
            "Successfully connected to the fall detection system.",
        )
    }

    pub fn connection_lost() -> Self {
        Notice::new(
            Severity::Error,
            "Connection Lost",
            "Lost connection to the camera system.",
        )
    }

    pub fn connection_restored() -> Self {
        Notice::new(
            Severity::Info,
            "Connection Restored",
            "The camera system is reachable again.",
        )
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_follows_mode() {
        assert_eq!(
            FeedVisibility::for_mode(Mode::Armed),
            FeedVisibility::Suppressed
        );
        assert_eq!(FeedVisibility::for_mode(Mode::Disarmed), FeedVisibility::Live);
    }

    #[test]
    fn fall_notice_names_event_time() {
        let event = FallEvent {
            subject_id: 3,
            frame_index: 900,
            timestamp: "2025-03-01 10:00:30".to_string(),
        };
        let notice = Notice::fall_detected(&event);
        assert_eq!(notice.severity, Severity::Alert);
        assert!(notice.body.ends_with("2025-03-01 10:00:30"));
    }
}
