//! Error types for fallwatch-core.
//! Transport failures inside a live session are never surfaced as errors; they
//! become status values, rollbacks or silent retries. These types cover the
//! edges: configuration, one-shot requests and session lifecycle.

use std::path::PathBuf;

use fallwatch_protocol::ErrorInfo;

// ═══════════════════════════════════════════════════════════════════════════════
// Transport Error (appliance and clip server requests)
// ═══════════════════════════════════════════════════════════════════════════════

/// Why a single HTTP exchange did not produce a usable answer.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("{endpoint} unreachable: {details}")]
    Unreachable { endpoint: String, details: String },

    #[error("{endpoint} responded with HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("{endpoint} returned a malformed body: {details}")]
    Malformed { endpoint: String, details: String },

    #[error("{endpoint} reported {info}")]
    Protocol { endpoint: String, info: ErrorInfo },
}

impl TransportError {
    pub fn endpoint(&self) -> &str {
        match self {
            TransportError::Unreachable { endpoint, .. }
            | TransportError::Status { endpoint, .. }
            | TransportError::Malformed { endpoint, .. }
            | TransportError::Protocol { endpoint, .. } => endpoint,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Monitor Error
// ═══════════════════════════════════════════════════════════════════════════════

/// All errors a caller of fallwatch-core can observe.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Configuration invalid: {field}: {reason}")]
    ConfigInvalid { field: &'static str, reason: String },

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Session Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("No authenticated session; sign in before opening the live view")]
    NotAuthenticated,

    #[error("Monitoring session already closed")]
    SessionClosed,

    // ─────────────────────────────────────────────────────────────────────
    // Request Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to list recorded clips: {0}")]
    ClipListing(#[source] TransportError),
}

/// Convenience type alias for Results using MonitorError.
pub type Result<T> = std::result::Result<T, MonitorError>;
