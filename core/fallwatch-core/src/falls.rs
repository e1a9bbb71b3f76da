//! Fall event poller.
//!
//! Each poll compares the appliance's event count against the ledger; only a
//! changed count leads to inspecting the newest event, and only a timestamp
//! not yet alerted on produces an alert. Bursts between two polls fold into a
//! single alert for the newest event.

use fallwatch_protocol::{FallEvent, FallLog};
use serde::Serialize;

use crate::error::TransportError;

/// What the poller has already seen and surfaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventLedger {
    pub count: u64,
    pub last_notified_timestamp: Option<String>,
}

/// Count and newest timestamp, for "N falls, last at T" displays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FallSummary {
    pub count: u64,
    pub latest_timestamp: Option<String>,
}

/// Result of applying one fetched log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Count unchanged; the log was not inspected.
    Unchanged,
    /// Count changed but there is nothing new to alert on.
    Updated(FallSummary),
    /// Count changed and the newest event had not been alerted on.
    Alert {
        event: FallEvent,
        summary: FallSummary,
    },
}

#[derive(Debug, Default)]
pub struct FallEventPoller {
    ledger: EventLedger,
    latest_timestamp: Option<String>,
}

impl FallEventPoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &EventLedger {
        &self.ledger
    }

    pub fn summary(&self) -> FallSummary {
        FallSummary {
            count: self.ledger.count,
            latest_timestamp: self.latest_timestamp.clone(),
        }
    }

    pub fn observe(&mut self, log: FallLog) -> PollOutcome {
        if log.count == self.ledger.count {
            return PollOutcome::Unchanged;
        }

        tracing::debug!(
            previous = self.ledger.count,
            count = log.count,
            "Fall count changed"
        );
        self.ledger.count = log.count;

        let Some(newest) = log.falls.into_iter().last() else {
            return PollOutcome::Updated(self.summary());
        };
        self.latest_timestamp = Some(newest.timestamp.clone());

        if self.ledger.last_notified_timestamp.as_deref() == Some(newest.timestamp.as_str()) {
            return PollOutcome::Updated(self.summary());
        }

        self.ledger.last_notified_timestamp = Some(newest.timestamp.clone());
        tracing::info!(
            subject_id = newest.subject_id,
            frame_index = newest.frame_index,
            timestamp = %newest.timestamp,
            "Fall detected"
        );
        PollOutcome::Alert {
            event: newest,
            summary: self.summary(),
        }
    }

    /// Transport failures are retried on the next tick; the ledger is left
    /// untouched.
    pub fn observe_failure(&self, err: &TransportError) {
        tracing::debug!(error = %err, "Fall poll failed; retrying next tick");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fall(subject_id: i64, timestamp: &str) -> FallEvent {
        FallEvent {
            subject_id,
            frame_index: subject_id * 100,
            timestamp: timestamp.to_string(),
        }
    }

    fn log(falls: Vec<FallEvent>) -> FallLog {
        let count = falls.len() as u64;
        FallLog { falls, count }
    }

    #[test]
    fn burst_between_polls_alerts_once_for_newest() {
        let mut poller = FallEventPoller::new();
        let outcome = poller.observe(log(vec![
            fall(1, "2025-03-01 10:00:01"),
            fall(2, "2025-03-01 10:00:02"),
            fall(3, "2025-03-01 10:00:03"),
        ]));

        match outcome {
            PollOutcome::Alert { event, summary } => {
                assert_eq!(event.timestamp, "2025-03-01 10:00:03");
                assert_eq!(summary.count, 3);
            }
            other => panic!("expected alert, got {:?}", other),
        }
        assert_eq!(
            poller.ledger().last_notified_timestamp.as_deref(),
            Some("2025-03-01 10:00:03")
        );
    }

    #[test]
    fn unchanged_count_skips_inspection() {
        let mut poller = FallEventPoller::new();
        poller.observe(log(vec![fall(1, "2025-03-01 10:00:01")]));

        let outcome = poller.observe(log(vec![fall(9, "2025-03-01 11:00:00")]));
        assert_eq!(outcome, PollOutcome::Unchanged);
        assert_eq!(
            poller.ledger().last_notified_timestamp.as_deref(),
            Some("2025-03-01 10:00:01")
        );
    }

    #[test]
    fn empty_log_with_new_count_updates_without_alert() {
        let mut poller = FallEventPoller::new();
        let outcome = poller.observe(FallLog {
            falls: Vec::new(),
            count: 4,
        });

        assert_eq!(
            outcome,
            PollOutcome::Updated(FallSummary {
                count: 4,
                latest_timestamp: None
            })
        );
        assert_eq!(poller.ledger().count, 4);
        assert_eq!(poller.ledger().last_notified_timestamp, None);
    }

    #[test]
    fn count_round_trip_does_not_realert() {
        let mut poller = FallEventPoller::new();
        let first = vec![fall(1, "2025-03-01 10:00:01"), fall(2, "2025-03-01 10:00:02")];
        assert!(matches!(
            poller.observe(log(first.clone())),
            PollOutcome::Alert { .. }
        ));

        // Backend reset drops the count, then it climbs back to the same log.
        assert!(matches!(
            poller.observe(log(Vec::new())),
            PollOutcome::Updated(_)
        ));
        let outcome = poller.observe(log(first));
        assert!(matches!(outcome, PollOutcome::Updated(_)));
    }

    #[test]
    fn new_event_after_alert_alerts_again() {
        let mut poller = FallEventPoller::new();
        poller.observe(log(vec![fall(1, "2025-03-01 10:00:01")]));

        let outcome = poller.observe(log(vec![
            fall(1, "2025-03-01 10:00:01"),
            fall(1, "2025-03-01 10:05:00"),
        ]));
        match outcome {
            PollOutcome::Alert { event, .. } => assert_eq!(event.timestamp, "2025-03-01 10:05:00"),
            other => panic!("expected alert, got {:?}", other),
        }
    }

    #[test]
    fn summary_tracks_latest_even_without_alert() {
        let mut poller = FallEventPoller::new();
        poller.observe(log(vec![fall(1, "2025-03-01 10:00:01")]));
        poller.observe(FallLog {
            falls: vec![fall(1, "2025-03-01 10:00:01")],
            count: 7,
        });

        assert_eq!(
            poller.summary(),
            FallSummary {
                count: 7,
                latest_timestamp: Some("2025-03-01 10:00:01".to_string())
            }
        );
    }

    #[test]
    fn failure_leaves_ledger_untouched() {
        let mut poller = FallEventPoller::new();
        poller.observe(log(vec![fall(1, "2025-03-01 10:00:01")]));
        let before = poller.ledger().clone();

        poller.observe_failure(&TransportError::Unreachable {
            endpoint: "/falls".to_string(),
            details: "timed out".to_string(),
        });
        assert_eq!(poller.ledger(), &before);
    }
}
