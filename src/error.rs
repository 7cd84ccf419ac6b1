//! Crate-level error taxonomy.
//!
//! Per-session faults reach the caller through the session's
//! [`EventSink`](crate::session::EventSink); only `InvalidSettings` and
//! `Closed` are ever returned synchronously from `open`/`write`.

use crate::port::PortError;
use thiserror::Error;

/// Unified error type for catalog, settings and session operations.
#[derive(Debug, Error)]
pub enum SerialError {
    /// The OS port enumeration failed as a whole.
    #[error("Failed to enumerate serial ports: {0}")]
    Enumeration(#[source] PortError),

    /// A caller-provided setting is outside its domain.
    #[error("Invalid setting '{field}': {reason}")]
    InvalidSettings { field: &'static str, reason: String },

    /// The device could not be opened; the session never ran.
    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: PortError,
    },

    /// A single read or write failed; the session keeps running.
    #[error("I/O error on open port: {0}")]
    Io(#[source] PortError),

    /// The device is unreachable; the session has ended.
    #[error("Device unreachable, session closed: {0}")]
    FatalDevice(#[source] PortError),

    /// The session is already closed.
    #[error("Port session is closed")]
    Closed,
}

impl SerialError {
    /// Create an InvalidSettings error.
    pub fn invalid_settings(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidSettings {
            field,
            reason: reason.into(),
        }
    }

    /// Whether this error ended (or prevented) the session it was reported on.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Open { .. } | Self::FatalDevice(_) | Self::Closed)
    }
}

/// Convenient Result type for crate operations.
pub type SerialResult<T> = Result<T, SerialError>;
