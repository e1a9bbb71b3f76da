//! # fallwatch-core
//!
//! Live monitoring session controller for a remote fall-detection camera
//! appliance: connection liveness, armed/disarmed mode with optimistic
//! updates, fall-event polling with de-duplicated alerts, and cache-busted
//! live-feed reloads.
//!
//! ## Design Principles
//!
//! - **Single owner**: each piece of session state is written by exactly one
//!   component, and all components live inside one actor task.
//! - **Degrade, don't fail**: network trouble becomes a `Disconnected` status,
//!   a rollback or a silent retry; nothing in a live session is fatal.
//! - **Latest wins**: feed reloads and mode commands carry generation counters
//!   so late responses never overwrite newer intent.
//! - **Pure components**: the supervisor, mode controller, poller and feed
//!   refresher are plain state machines, testable without a runtime.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fallwatch_core::{activate, load_config, HttpApplianceTransport, LocalOperator};
//!
//! let config = load_config(None)?;
//! let transport = HttpApplianceTransport::new(config.appliance_base()?, config.request_timeout())?;
//! let identity = LocalOperator::from_config(&config.identity);
//! let (session, mut events) = activate(&config, Arc::new(transport), &identity)?;
//! while let Some(event) = events.recv().await {
//!     // render
//! }
//! ```

pub mod clips;
pub mod config;
pub mod connection;
pub mod error;
pub mod falls;
pub mod feed;
pub mod identity;
pub mod mode;
pub mod session;
pub mod transport;
pub mod types;

pub use clips::{Clip, ClipCatalog};
pub use config::{load_config, MonitorConfig};
pub use connection::{ConnectionSupervisor, Heartbeat, HeartbeatOutcome, ProbeOutcome};
pub use error::{MonitorError, Result, TransportError};
pub use falls::{EventLedger, FallEventPoller, FallSummary, PollOutcome};
pub use feed::{FeedCompletion, FeedGeneration, FeedLoad, FeedRefresher};
pub use identity::{IdentityProvider, LocalOperator, UserProfile};
pub use mode::{CommandTicket, ModeCommand, ModeController, ToggleResult};
pub use session::{
    activate, activate_with, SessionHandle, SessionSettings, SessionSnapshot, ViewEvent,
    ViewEvents,
};
pub use transport::{ApplianceTransport, HttpApplianceTransport};
pub use types::{ConnectionStatus, FeedVisibility, Mode, Notice, Severity};
