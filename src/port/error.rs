//! Device-level error types.
//!
//! `PortError` describes what went wrong talking to one device. The session
//! worker never surfaces it raw: it asks [`PortError::fault`] whether the
//! failure is a timeout, a transient hiccup, or the device going away, and
//! reclassifies it into the crate-level [`SerialError`](crate::SerialError).

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during serial device operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The device stopped answering (unplugged, powered off, handle revoked).
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// How the worker should react to a [`PortError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Nothing arrived within the read timeout. Not an error.
    Timeout,
    /// A single failed operation; the device is assumed reachable.
    Transient,
    /// The device is gone; the session must end.
    Fatal,
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Timeout error from a duration.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Create a Disconnected error from a message.
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::Disconnected(message.into())
    }

    /// Classify this error for the worker loop.
    pub fn fault(&self) -> Fault {
        match self {
            Self::Timeout(_) => Fault::Timeout,
            Self::NotFound(_) | Self::Disconnected(_) => Fault::Fatal,
            Self::Config(_) => Fault::Transient,
            Self::Io(err) => classify_io(err),
            Self::Serial(err) => match err.kind() {
                serialport::ErrorKind::NoDevice => Fault::Fatal,
                serialport::ErrorKind::Io(kind) => classify_kind(kind, None),
                _ => Fault::Transient,
            },
        }
    }

    /// Shorthand for `self.fault() == Fault::Fatal`.
    pub fn is_fatal(&self) -> bool {
        self.fault() == Fault::Fatal
    }
}

fn classify_io(err: &io::Error) -> Fault {
    classify_kind(err.kind(), err.raw_os_error())
}

fn classify_kind(kind: io::ErrorKind, raw: Option<i32>) -> Fault {
    match kind {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => {
            Fault::Timeout
        }
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::NotConnected
        | io::ErrorKind::NotFound
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::PermissionDenied => Fault::Fatal,
        _ if raw.is_some_and(is_fatal_os_error) => Fault::Fatal,
        _ => Fault::Transient,
    }
}

#[cfg(unix)]
fn is_fatal_os_error(code: i32) -> bool {
    matches!(code, libc::EIO | libc::ENXIO | libc::ENODEV | libc::EBADF)
}

#[cfg(windows)]
fn is_fatal_os_error(code: i32) -> bool {
    use winapi::shared::winerror;

    matches!(
        code as u32,
        winerror::ERROR_DEVICE_NOT_CONNECTED
            | winerror::ERROR_BAD_COMMAND
            | winerror::ERROR_ACCESS_DENIED
            | winerror::ERROR_INVALID_HANDLE
            | winerror::ERROR_GEN_FAILURE
            | winerror::ERROR_FILE_NOT_FOUND
    )
}

#[cfg(not(any(unix, windows)))]
fn is_fatal_os_error(_code: i32) -> bool {
    false
}
