//! Open port sessions.
//!
//! A session is one open-to-close cycle of one device. The caller holds an
//! [`OpenPort`]; a dedicated worker thread owns the device handle. The two
//! share only a write queue, a stop flag and the session state:
//!
//! ```text
//! OpenPort::write ──> write queue ──┐
//! OpenPort::close ──> stop flag ────┼──> worker thread ──> device
//!                                   └──< EventSink (data / errors)
//! ```
//!
//! `close()` blocks until the worker has released the device, so once it
//! returns no further events are delivered and `write()` fails with
//! [`SerialError::Closed`](crate::SerialError::Closed).

mod event;
mod handle;
mod worker;

pub use event::{Callbacks, EventSink, SessionEvent};
pub use handle::{OpenPort, SessionBuilder};
pub use worker::WorkerOptions;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// The worker is opening the device.
    Opening,
    /// The device is open and being serviced.
    Running,
    /// The worker is flushing and releasing the device.
    Closing,
    /// Terminal. The device handle has been released.
    Closed,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Opening,
            1 => Self::Running,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Opening => 0,
            Self::Running => 1,
            Self::Closing => 2,
            Self::Closed => 3,
        }
    }
}

/// State shared between an [`OpenPort`] and its worker.
#[derive(Debug)]
pub(crate) struct SessionShared {
    stop: AtomicBool,
    state: AtomicU8,
}

impl SessionShared {
    pub(crate) fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
            state: AtomicU8::new(SessionState::Opening.as_u8()),
        }
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub(crate) fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}
