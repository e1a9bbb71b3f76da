//! Live monitoring session controller.
//!
//! One actor task owns the connection supervisor, mode controller, fall poller
//! and feed refresher for the lifetime of a live view. Network calls run as
//! tasks in a per-session [`JoinSet`] and report back over a channel, so every
//! piece of state has exactly one writer and nothing is locked.
//!
//! Tearing the session down (dropping or shutting down the [`SessionHandle`])
//! clears the shared active flag, ends the actor loop and aborts every timer
//! and in-flight request together. Completions that race teardown check the
//! flag and are dropped.

use chrono::Utc;
use fallwatch_protocol::{FallLog, StatusResponse};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::MonitorConfig;
use crate::connection::{ConnectionSupervisor, Heartbeat};
use crate::error::{MonitorError, Result, TransportError};
use crate::falls::{FallEventPoller, FallSummary, PollOutcome};
use crate::feed::{FeedCompletion, FeedGeneration, FeedLoad, FeedRefresher};
use crate::identity::IdentityProvider;
use crate::mode::{ModeCommand, ModeController, ToggleResult};
use crate::transport::ApplianceTransport;
use crate::types::{ConnectionStatus, FeedVisibility, Mode, Notice};

/// Everything the view layer needs to render, pushed as it changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Status(ConnectionStatus),
    Mode {
        mode: Mode,
        visibility: FeedVisibility,
    },
    ToggleSettled(ToggleResult),
    /// Start loading the feed at zero opacity and report back with
    /// [`SessionHandle::feed_loaded`].
    LoadFeed(FeedLoad),
    /// Fade the feed in.
    RevealFeed(FeedGeneration),
    Falls(FallSummary),
    Notice(Notice),
}

pub type ViewEvents = mpsc::UnboundedReceiver<ViewEvent>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    pub mode: Mode,
    pub visibility: FeedVisibility,
    pub feed_generation: Option<FeedGeneration>,
    pub falls: FallSummary,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub heartbeat_interval: Duration,
    pub fall_poll_interval: Duration,
    pub feed_settle_delay: Duration,
}

/// Longest period the actor schedules. Larger values would overflow `Instant`.
const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);
/// Interval timers cannot have a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

impl SessionSettings {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval(),
            fall_poll_interval: config.fall_poll_interval(),
            feed_settle_delay: config.feed_settle_delay(),
        }
    }

    fn bounded(self) -> Self {
        Self {
            heartbeat_interval: bounded_period(
                "heartbeat_interval",
                self.heartbeat_interval,
                MIN_INTERVAL,
            ),
            fall_poll_interval: bounded_period(
                "fall_poll_interval",
                self.fall_poll_interval,
                MIN_INTERVAL,
            ),
            feed_settle_delay: bounded_period(
                "feed_settle_delay",
                self.feed_settle_delay,
                Duration::ZERO,
            ),
        }
    }
}

fn bounded_period(name: &'static str, period: Duration, min: Duration) -> Duration {
    let bounded = period.clamp(min, MAX_PERIOD);
    if bounded != period {
        tracing::warn!(setting = name, ?period, ?bounded, "Period out of range; clamping");
    }
    bounded
}

enum Command {
    Toggle(Mode),
    FeedLoaded(FeedGeneration),
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

enum Completion {
    Probe(std::result::Result<StatusResponse, TransportError>),
    Heartbeat(Heartbeat),
    Falls(std::result::Result<FallLog, TransportError>),
    Mode {
        command: ModeCommand,
        result: std::result::Result<(), TransportError>,
    },
    FeedSettled,
}

/// Mounts a live view: checks the session gate, then starts the probe,
/// heartbeat and fall polling. Must be called from within a tokio runtime.
pub fn activate(
    config: &MonitorConfig,
    transport: Arc<dyn ApplianceTransport>,
    identity: &dyn IdentityProvider,
) -> Result<(SessionHandle, ViewEvents)> {
    if !identity.has_active_session() {
        return Err(MonitorError::NotAuthenticated);
    }
    let base = config.appliance_base()?;
    let settings = SessionSettings::from_config(config);
    Ok(activate_with(settings, &base, transport))
}

/// Like [`activate`] without the gate or config file, for callers that have
/// already resolved both.
pub fn activate_with(
    settings: SessionSettings,
    appliance_base: &reqwest::Url,
    transport: Arc<dyn ApplianceTransport>,
) -> (SessionHandle, ViewEvents) {
    let settings = settings.bounded();
    let active = Arc::new(AtomicBool::new(true));
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (completion_tx, completion_rx) = mpsc::unbounded_channel();
    let (view_tx, view_rx) = mpsc::unbounded_channel();

    let actor = SessionActor {
        transport,
        active: Arc::clone(&active),
        connection: ConnectionSupervisor::new(),
        mode: ModeController::new(),
        falls: FallEventPoller::new(),
        feed: FeedRefresher::new(appliance_base),
        tasks: JoinSet::new(),
        completions: completion_tx,
        view: view_tx,
        feed_settle_delay: settings.feed_settle_delay,
        heartbeat_in_flight: false,
        poll_in_flight: false,
    };

    tracing::info!(appliance = %appliance_base, "Monitoring session activated");
    let task = tokio::spawn(actor.run(settings, command_rx, completion_rx));

    let handle = SessionHandle {
        commands: Some(command_tx),
        active,
        task: Some(task),
    };
    (handle, view_rx)
}

/// The view's side of a live session.
#[derive(Debug)]
pub struct SessionHandle {
    commands: Option<mpsc::UnboundedSender<Command>>,
    active: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Requests a mode change. The outcome arrives as
    /// [`ViewEvent::ToggleSettled`].
    pub fn toggle(&self, mode: Mode) -> Result<()> {
        self.send(Command::Toggle(mode))
    }

    /// Reports that the view finished loading the feed for `generation`.
    pub fn feed_loaded(&self, generation: FeedGeneration) -> Result<()> {
        self.send(Command::FeedLoaded(generation))
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        response.await.map_err(|_| MonitorError::SessionClosed)
    }

    /// Tears the session down and waits for the actor to finish cancelling
    /// its timers and requests.
    pub async fn shutdown(mut self) {
        self.active.store(false, Ordering::Release);
        self.commands.take();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "Monitoring session task ended abnormally");
            }
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        if !self.is_active() {
            return Err(MonitorError::SessionClosed);
        }
        self.commands
            .as_ref()
            .ok_or(MonitorError::SessionClosed)?
            .send(command)
            .map_err(|_| MonitorError::SessionClosed)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

struct SessionActor {
    transport: Arc<dyn ApplianceTransport>,
    active: Arc<AtomicBool>,
    connection: ConnectionSupervisor,
    mode: ModeController,
    falls: FallEventPoller,
    feed: FeedRefresher,
    tasks: JoinSet<()>,
    completions: mpsc::UnboundedSender<Completion>,
    view: mpsc::UnboundedSender<ViewEvent>,
    feed_settle_delay: Duration,
    heartbeat_in_flight: bool,
    poll_in_flight: bool,
}

impl SessionActor {
    async fn run(
        mut self,
        settings: SessionSettings,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        self.emit(ViewEvent::Status(self.connection.status()));
        self.emit_mode();
        self.spawn_probe();

        let start = Instant::now();
        let mut heartbeat = interval_at(
            start + settings.heartbeat_interval,
            settings.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut poll = interval_at(
            start + settings.fall_poll_interval,
            settings.fall_poll_interval,
        );
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if !self.active.load(Ordering::Acquire) {
                break;
            }

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(completion) = completions.recv() => self.handle_completion(completion),
                _ = heartbeat.tick() => self.spawn_heartbeat(),
                _ = poll.tick() => self.spawn_poll(),
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(err) = joined {
                        if err.is_panic() {
                            tracing::warn!(error = %err, "Session request task panicked");
                        }
                    }
                }
            }
        }

        self.active.store(false, Ordering::Release);
        let cancelled = self.tasks.len();
        self.tasks.shutdown().await;
        tracing::info!(cancelled, "Monitoring session torn down");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Toggle(mode) => {
                let command = self.mode.toggle(mode);
                self.emit_mode();
                let transport = Arc::clone(&self.transport);
                self.spawn(async move {
                    let result = transport.set_mode(command.mode).await.map(|_| ());
                    Completion::Mode { command, result }
                });
            }
            Command::FeedLoaded(generation) => {
                if let FeedCompletion::Reveal(generation) = self.feed.complete(generation) {
                    self.emit(ViewEvent::RevealFeed(generation));
                }
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Probe(result) => {
                let outcome = self.connection.apply_probe(result);
                self.emit(ViewEvent::Status(outcome.status));
                if let Some(mode) = outcome.reported_mode {
                    self.mode.prime(mode);
                    self.emit_mode();
                }
                if let Some(notice) = outcome.notice {
                    self.emit(ViewEvent::Notice(notice));
                }
                if outcome.refresh_feed {
                    self.schedule_feed_refresh();
                    self.spawn_poll();
                }
            }
            Completion::Heartbeat(heartbeat) => {
                self.heartbeat_in_flight = false;
                let outcome = self.connection.apply_heartbeat(heartbeat);
                if let Some(notice) = outcome.notice() {
                    self.emit(ViewEvent::Status(self.connection.status()));
                    self.emit(ViewEvent::Notice(notice));
                }
                if outcome.refresh_feed() {
                    self.refresh_feed();
                }
            }
            Completion::Falls(result) => {
                self.poll_in_flight = false;
                match result {
                    Ok(log) => match self.falls.observe(log) {
                        PollOutcome::Unchanged => {}
                        PollOutcome::Updated(summary) => self.emit(ViewEvent::Falls(summary)),
                        PollOutcome::Alert { event, summary } => {
                            self.emit(ViewEvent::Falls(summary));
                            self.emit(ViewEvent::Notice(Notice::fall_detected(&event)));
                        }
                    },
                    Err(err) => self.falls.observe_failure(&err),
                }
            }
            Completion::Mode { command, result } => {
                let settled = self.mode.acknowledge(command, result);
                self.emit(ViewEvent::ToggleSettled(settled));
                match settled {
                    ToggleResult::Applied {
                        refresh_feed: true, ..
                    } => self.schedule_feed_refresh(),
                    ToggleResult::Rejected { .. } => self.emit_mode(),
                    ToggleResult::Reconciled { refresh_feed, .. } => {
                        self.emit_mode();
                        if refresh_feed {
                            self.schedule_feed_refresh();
                        }
                    }
                    _ => {}
                }
                if let Some(notice) = settled.notice() {
                    self.emit(ViewEvent::Notice(notice));
                }
            }
            Completion::FeedSettled => self.refresh_feed(),
        }
    }

    fn spawn_probe(&mut self) {
        let transport = Arc::clone(&self.transport);
        self.spawn(async move { Completion::Probe(transport.status().await) });
    }

    fn spawn_heartbeat(&mut self) {
        if self.heartbeat_in_flight {
            tracing::debug!("Previous heartbeat still in flight; skipping tick");
            return;
        }
        self.heartbeat_in_flight = true;
        let transport = Arc::clone(&self.transport);
        self.spawn(async move { Completion::Heartbeat(Heartbeat::from(&transport.ping().await)) });
    }

    fn spawn_poll(&mut self) {
        if self.poll_in_flight {
            tracing::debug!("Previous fall poll still in flight; skipping tick");
            return;
        }
        self.poll_in_flight = true;
        let transport = Arc::clone(&self.transport);
        self.spawn(async move { Completion::Falls(transport.falls().await) });
    }

    /// Reloads the feed after the settle delay, giving the appliance time to
    /// resume its video pipeline.
    fn schedule_feed_refresh(&mut self) {
        let delay = self.feed_settle_delay;
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            Completion::FeedSettled
        });
    }

    fn refresh_feed(&mut self) {
        if !self.mode.visibility().is_live() {
            tracing::debug!("Feed suppressed; skipping reload");
            return;
        }
        if self.connection.status() != ConnectionStatus::Connected {
            tracing::debug!(status = ?self.connection.status(), "Not connected; skipping reload");
            return;
        }
        let load = self.feed.refresh(Utc::now());
        self.emit(ViewEvent::LoadFeed(load));
    }

    fn spawn<F>(&mut self, work: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let active = Arc::clone(&self.active);
        let completions = self.completions.clone();
        self.tasks.spawn(async move {
            let completion = work.await;
            if active.load(Ordering::Acquire) {
                let _ = completions.send(completion);
            }
        });
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.connection.status(),
            mode: self.mode.mode(),
            visibility: self.mode.visibility(),
            feed_generation: self.feed.latest(),
            falls: self.falls.summary(),
        }
    }

    fn emit_mode(&self) {
        self.emit(ViewEvent::Mode {
            mode: self.mode.mode(),
            visibility: self.mode.visibility(),
        });
    }

    fn emit(&self, event: ViewEvent) {
        if self.view.send(event).is_err() {
            tracing::debug!("View detached; dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_are_bounded_to_schedulable_periods() {
        let settings = SessionSettings {
            heartbeat_interval: Duration::MAX,
            fall_poll_interval: Duration::ZERO,
            feed_settle_delay: Duration::from_millis(300),
        }
        .bounded();

        assert_eq!(settings.heartbeat_interval, MAX_PERIOD);
        assert_eq!(settings.fall_poll_interval, MIN_INTERVAL);
        assert_eq!(settings.feed_settle_delay, Duration::from_millis(300));
    }
}
