//! Connection supervisor.
//!
//! Owns the tri-state [`ConnectionStatus`]. The initial status probe is the
//! only thing that leaves `Connecting`; afterwards heartbeat outcomes flip the
//! status between `Connected` and `Disconnected`. Network errors are never
//! errors here, only reachability evidence.

use fallwatch_protocol::StatusResponse;

use crate::error::TransportError;
use crate::types::{ConnectionStatus, Mode, Notice};

/// Result of a single liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heartbeat {
    Alive,
    Unreachable,
}

impl<E> From<&Result<(), E>> for Heartbeat {
    fn from(result: &Result<(), E>) -> Self {
        match result {
            Ok(()) => Heartbeat::Alive,
            Err(_) => Heartbeat::Unreachable,
        }
    }
}

/// Status after applying one heartbeat to `current`.
///
/// Heartbeats do not resolve `Connecting`; that belongs to the initial probe.
pub fn next_status(current: ConnectionStatus, heartbeat: Heartbeat) -> ConnectionStatus {
    match (current, heartbeat) {
        (ConnectionStatus::Connecting, _) => ConnectionStatus::Connecting,
        (_, Heartbeat::Alive) => ConnectionStatus::Connected,
        (_, Heartbeat::Unreachable) => ConnectionStatus::Disconnected,
    }
}

/// What the session should do after the initial status probe settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: ConnectionStatus,
    /// Mode the appliance reported, for priming the mode controller.
    pub reported_mode: Option<Mode>,
    /// Schedule a feed reload after the settle delay.
    pub refresh_feed: bool,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// Status already matched the heartbeat; nothing to do.
    Unchanged,
    /// Disconnected -> Connected. The feed should be reloaded.
    Restored,
    /// Connected -> Disconnected.
    Lost,
}

impl HeartbeatOutcome {
    pub fn refresh_feed(&self) -> bool {
        matches!(self, HeartbeatOutcome::Restored)
    }

    pub fn notice(&self) -> Option<Notice> {
        match self {
            HeartbeatOutcome::Unchanged => None,
            HeartbeatOutcome::Restored => Some(Notice::connection_restored()),
            HeartbeatOutcome::Lost => Some(Notice::connection_lost()),
        }
    }
}

#[derive(Debug)]
pub struct ConnectionSupervisor {
    status: ConnectionStatus,
}

impl Default for ConnectionSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionSupervisor {
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Connecting,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn apply_probe(
        &mut self,
        result: Result<StatusResponse, TransportError>,
    ) -> ProbeOutcome {
        match result {
            Ok(status) => {
                tracing::info!(
                    armed = status.armed,
                    camera_active = status.camera_active,
                    fall_detection_active = status.fall_detection_active,
                    "Appliance reachable"
                );
                self.status = ConnectionStatus::Connected;
                ProbeOutcome {
                    status: self.status,
                    reported_mode: Some(Mode::from_armed(status.armed)),
                    refresh_feed: true,
                    notice: Some(Notice::connected()),
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "Initial appliance probe failed");
                self.status = ConnectionStatus::Disconnected;
                ProbeOutcome {
                    status: self.status,
                    reported_mode: None,
                    refresh_feed: false,
                    notice: None,
                }
            }
        }
    }

    pub fn apply_heartbeat(&mut self, heartbeat: Heartbeat) -> HeartbeatOutcome {
        let previous = self.status;
        let next = next_status(previous, heartbeat);
        self.status = next;

        match (previous, next) {
            (ConnectionStatus::Disconnected, ConnectionStatus::Connected) => {
                tracing::info!("Heartbeat restored appliance connection");
                HeartbeatOutcome::Restored
            }
            (ConnectionStatus::Connected, ConnectionStatus::Disconnected) => {
                tracing::warn!("Heartbeat lost appliance connection");
                HeartbeatOutcome::Lost
            }
            _ => {
                tracing::debug!(status = ?next, heartbeat = ?heartbeat, "Heartbeat consistent");
                HeartbeatOutcome::Unchanged
            }
        }
    }
}
