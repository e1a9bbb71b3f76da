//! Mode controller: armed/disarmed with optimistic updates.
//!
//! A toggle is applied locally before the appliance acknowledges it. Every
//! command carries a ticket from a monotonic counter, and only the most
//! recently issued command may settle the local state: an acknowledgement for
//! an older ticket is reported as superseded and changes nothing visible, even
//! if it arrives last. Rollback restores the last mode the appliance confirmed.
//! The one exception: once nothing is pending, a late success that moves the
//! confirmed mode also moves the view, so it never disagrees with the
//! appliance.

use crate::error::TransportError;
use crate::types::{FeedVisibility, Mode, Notice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandTicket(u64);

impl CommandTicket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// A mode change waiting to be sent to the appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeCommand {
    pub ticket: CommandTicket,
    pub mode: Mode,
}

/// How an acknowledgement settled. The view consumes this instead of
/// inferring rollback from callback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleResult {
    Applied {
        mode: Mode,
        /// Reload the feed once the appliance has had time to resume frames.
        refresh_feed: bool,
    },
    Rejected {
        reverted_to: Mode,
    },
    /// A newer command was issued before this one settled.
    Superseded {
        ticket: CommandTicket,
    },
    /// An older command succeeded after the newest one was rejected, so the
    /// appliance is in `mode` and the view was moved back to match it.
    Reconciled {
        mode: Mode,
        refresh_feed: bool,
    },
}

impl ToggleResult {
    pub fn notice(&self) -> Option<Notice> {
        match self {
            ToggleResult::Applied { mode, .. } | ToggleResult::Reconciled { mode, .. } => {
                Some(Notice::mode_confirmed(*mode))
            }
            ToggleResult::Rejected { .. } => Some(Notice::mode_rejected()),
            ToggleResult::Superseded { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct ModeController {
    mode: Mode,
    visibility: FeedVisibility,
    confirmed: Mode,
    confirmed_ticket: u64,
    issued: u64,
    pending: Option<CommandTicket>,
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeController {
    pub fn new() -> Self {
        Self {
            mode: Mode::Disarmed,
            visibility: FeedVisibility::Live,
            confirmed: Mode::Disarmed,
            confirmed_ticket: 0,
            issued: 0,
            pending: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn visibility(&self) -> FeedVisibility {
        self.visibility
    }

    /// Last mode the appliance is known to be in.
    pub fn confirmed(&self) -> Mode {
        self.confirmed
    }

    pub fn pending(&self) -> Option<CommandTicket> {
        self.pending
    }

    /// Records the mode reported by the initial status probe. A toggle already
    /// in flight keeps its optimistic value.
    pub fn prime(&mut self, reported: Mode) {
        if self.confirmed_ticket == 0 {
            self.confirmed = reported;
        }
        if self.pending.is_none() {
            self.mode = self.confirmed;
            self.visibility = FeedVisibility::for_mode(self.confirmed);
        }
        tracing::debug!(mode = %self.mode, reported = %reported, "Mode primed from probe");
    }

    /// Applies `mode` locally and returns the command to send. Arming hides
    /// the feed immediately.
    pub fn toggle(&mut self, mode: Mode) -> ModeCommand {
        self.issued += 1;
        let ticket = CommandTicket(self.issued);
        self.mode = mode;
        self.visibility = FeedVisibility::for_mode(mode);
        self.pending = Some(ticket);
        tracing::info!(ticket = ticket.value(), mode = %mode, "Mode change issued");
        ModeCommand { ticket, mode }
    }

    pub fn acknowledge(
        &mut self,
        command: ModeCommand,
        result: Result<(), TransportError>,
    ) -> ToggleResult {
        let latest = self.pending == Some(command.ticket);

        match result {
            Ok(()) => {
                let newer = command.ticket.value() > self.confirmed_ticket;
                if newer {
                    self.confirmed = command.mode;
                    self.confirmed_ticket = command.ticket.value();
                }
                if !latest && newer && self.pending.is_none() && self.mode != self.confirmed {
                    // Nothing newer is in flight, so the view has to follow
                    // the appliance.
                    self.mode = self.confirmed;
                    self.visibility = FeedVisibility::for_mode(self.confirmed);
                    tracing::info!(
                        ticket = command.ticket.value(),
                        mode = %command.mode,
                        "Late acknowledgement moved appliance; view reconciled"
                    );
                    return ToggleResult::Reconciled {
                        mode: command.mode,
                        refresh_feed: self.visibility.is_live(),
                    };
                }
                if !latest {
                    tracing::debug!(
                        ticket = command.ticket.value(),
                        mode = %command.mode,
                        "Superseded mode change acknowledged"
                    );
                    return ToggleResult::Superseded {
                        ticket: command.ticket,
                    };
                }
                self.pending = None;
                tracing::info!(mode = %command.mode, "Mode change confirmed");
                ToggleResult::Applied {
                    mode: command.mode,
                    refresh_feed: !command.mode.is_armed() && self.visibility.is_live(),
                }
            }
            Err(err) => {
                if !latest {
                    tracing::warn!(
                        ticket = command.ticket.value(),
                        error = %err,
                        "Superseded mode change failed"
                    );
                    return ToggleResult::Superseded {
                        ticket: command.ticket,
                    };
                }
                self.pending = None;
                self.mode = self.confirmed;
                self.visibility = FeedVisibility::for_mode(self.confirmed);
                tracing::warn!(
                    error = %err,
                    attempted = %command.mode,
                    reverted_to = %self.mode,
                    "Mode change rejected; rolled back"
                );
                ToggleResult::Rejected {
                    reverted_to: self.mode,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refused() -> Result<(), TransportError> {
        Err(TransportError::Status {
            endpoint: "/mode".to_string(),
            status: 500,
        })
    }

    #[test]
    fn arming_hides_feed_before_acknowledgement() {
        let mut controller = ModeController::new();
        controller.toggle(Mode::Armed);

        assert_eq!(controller.mode(), Mode::Armed);
        assert_eq!(controller.visibility(), FeedVisibility::Suppressed);
        assert_eq!(controller.confirmed(), Mode::Disarmed);
    }

    #[test]
    fn confirmed_disarm_requests_feed_refresh() {
        let mut controller = ModeController::new();
        controller.prime(Mode::Armed);

        let command = controller.toggle(Mode::Disarmed);
        let result = controller.acknowledge(command, Ok(()));

        assert_eq!(
            result,
            ToggleResult::Applied {
                mode: Mode::Disarmed,
                refresh_feed: true
            }
        );
        assert_eq!(controller.visibility(), FeedVisibility::Live);
        assert_eq!(controller.pending(), None);
    }

    #[test]
    fn confirmed_arm_does_not_refresh_feed() {
        let mut controller = ModeController::new();
        let command = controller.toggle(Mode::Armed);

        assert_eq!(
            controller.acknowledge(command, Ok(())),
            ToggleResult::Applied {
                mode: Mode::Armed,
                refresh_feed: false
            }
        );
    }

    #[test]
    fn rejected_toggle_restores_prior_mode_and_visibility() {
        let mut controller = ModeController::new();
        let before = (controller.mode(), controller.visibility());

        let command = controller.toggle(Mode::Armed);
        let result = controller.acknowledge(command, refused());

        assert_eq!(
            result,
            ToggleResult::Rejected {
                reverted_to: Mode::Disarmed
            }
        );
        assert_eq!((controller.mode(), controller.visibility()), before);
        assert!(result.notice().expect("notice").is_error());
    }

    #[test]
    fn latest_issued_command_wins_when_acks_arrive_out_of_order() {
        let mut controller = ModeController::new();
        let arm = controller.toggle(Mode::Armed);
        let disarm = controller.toggle(Mode::Disarmed);

        let first = controller.acknowledge(disarm, Ok(()));
        let second = controller.acknowledge(arm, Ok(()));

        assert!(matches!(first, ToggleResult::Applied { mode: Mode::Disarmed, .. }));
        assert_eq!(second, ToggleResult::Superseded { ticket: arm.ticket });
        assert_eq!(controller.mode(), Mode::Disarmed);
        assert_eq!(controller.visibility(), FeedVisibility::Live);
        assert_eq!(controller.confirmed(), Mode::Disarmed);
    }

    #[test]
    fn latest_issued_command_wins_when_acks_arrive_in_order() {
        let mut controller = ModeController::new();
        let arm = controller.toggle(Mode::Armed);
        let disarm = controller.toggle(Mode::Disarmed);

        assert_eq!(
            controller.acknowledge(arm, Ok(())),
            ToggleResult::Superseded { ticket: arm.ticket }
        );
        assert!(matches!(
            controller.acknowledge(disarm, Ok(())),
            ToggleResult::Applied { mode: Mode::Disarmed, .. }
        ));
        assert_eq!(controller.mode(), Mode::Disarmed);
    }

    #[test]
    fn superseded_failure_never_rolls_back() {
        let mut controller = ModeController::new();
        let arm = controller.toggle(Mode::Armed);
        let _disarm = controller.toggle(Mode::Disarmed);

        let result = controller.acknowledge(arm, refused());
        assert_eq!(result, ToggleResult::Superseded { ticket: arm.ticket });
        assert_eq!(result.notice(), None);
        assert_eq!(controller.mode(), Mode::Disarmed);
    }

    #[test]
    fn rollback_targets_last_confirmed_mode() {
        let mut controller = ModeController::new();
        let arm = controller.toggle(Mode::Armed);
        let disarm = controller.toggle(Mode::Disarmed);

        controller.acknowledge(arm, Ok(()));
        let result = controller.acknowledge(disarm, refused());

        assert_eq!(
            result,
            ToggleResult::Rejected {
                reverted_to: Mode::Armed
            }
        );
        assert_eq!(controller.visibility(), FeedVisibility::Suppressed);
    }

    #[test]
    fn late_success_after_rejection_moves_view_to_appliance_mode() {
        let mut controller = ModeController::new();
        let arm = controller.toggle(Mode::Armed);
        let disarm = controller.toggle(Mode::Disarmed);

        assert_eq!(
            controller.acknowledge(disarm, refused()),
            ToggleResult::Rejected {
                reverted_to: Mode::Disarmed
            }
        );
        let late = controller.acknowledge(arm, Ok(()));

        assert_eq!(
            late,
            ToggleResult::Reconciled {
                mode: Mode::Armed,
                refresh_feed: false
            }
        );
        assert_eq!(controller.mode(), controller.confirmed());
        assert_eq!(controller.mode(), Mode::Armed);
        assert_eq!(controller.visibility(), FeedVisibility::Suppressed);
        assert_eq!(controller.pending(), None);
    }

    #[test]
    fn late_success_with_newer_command_in_flight_stays_superseded() {
        let mut controller = ModeController::new();
        let arm = controller.toggle(Mode::Armed);
        let _disarm = controller.toggle(Mode::Disarmed);

        assert_eq!(
            controller.acknowledge(arm, Ok(())),
            ToggleResult::Superseded { ticket: arm.ticket }
        );
        assert_eq!(controller.mode(), Mode::Disarmed);
        assert_eq!(controller.confirmed(), Mode::Armed);
    }

    #[test]
    fn prime_does_not_clobber_in_flight_toggle() {
        let mut controller = ModeController::new();
        controller.toggle(Mode::Armed);
        controller.prime(Mode::Disarmed);

        assert_eq!(controller.mode(), Mode::Armed);
        assert_eq!(controller.confirmed(), Mode::Disarmed);
    }

    #[test]
    fn prime_sets_mode_and_visibility() {
        let mut controller = ModeController::new();
        controller.prime(Mode::Armed);

        assert_eq!(controller.mode(), Mode::Armed);
        assert_eq!(controller.visibility(), FeedVisibility::Suppressed);
    }
}
