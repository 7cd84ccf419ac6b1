//! Shared test utilities for serial-session integration tests.
//!
//! - `EventLog`: an `EventSink` that records every event and lets tests wait
//!   for a condition instead of sleeping
//! - `mock_session`: spawn a session on a `MockSerialPort`

#![allow(dead_code)]

use parking_lot::{Condvar, Mutex};
use serial_session::{
    EventSink, MockSerialPort, OpenPort, PartialSettings, SerialError, SessionBuilder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Generous upper bound for anything that should happen within a few read
/// timeouts. Loaded CI machines schedule threads late.
pub const WAIT: Duration = Duration::from_secs(2);

/// A recorded session event.
#[derive(Debug)]
pub enum Recorded {
    Data(Vec<u8>),
    Error(SerialError),
}

#[derive(Default)]
struct Inner {
    events: Mutex<Vec<Recorded>>,
    changed: Condvar,
}

/// Thread-safe record of everything a session delivered.
#[derive(Clone, Default)]
pub struct EventLog {
    inner: Arc<Inner>,
}

impl EventSink for EventLog {
    fn on_data(&mut self, data: Vec<u8>) {
        self.inner.events.lock().push(Recorded::Data(data));
        self.inner.changed.notify_all();
    }

    fn on_error(&mut self, error: SerialError) {
        self.inner.events.lock().push(Recorded::Error(error));
        self.inner.changed.notify_all();
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `pred` holds for the recorded events, or `timeout` passes.
    pub fn wait_for(&self, timeout: Duration, pred: impl Fn(&[Recorded]) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut events = self.inner.events.lock();
        while !pred(events.as_slice()) {
            if self
                .inner
                .changed
                .wait_until(&mut events, deadline)
                .timed_out()
            {
                return pred(events.as_slice());
            }
        }
        true
    }

    /// Wait until at least `n` bytes of data have arrived.
    pub fn wait_for_bytes(&self, n: usize) -> bool {
        self.wait_for(WAIT, |events| data_of(events).len() >= n)
    }

    /// Wait until at least `n` errors have arrived.
    pub fn wait_for_errors(&self, n: usize) -> bool {
        self.wait_for(WAIT, |events| error_count(events) >= n)
    }

    pub fn len(&self) -> usize {
        self.inner.events.lock().len()
    }

    /// All received data, concatenated.
    pub fn data(&self) -> Vec<u8> {
        data_of(&self.inner.events.lock())
    }

    pub fn data_events(&self) -> usize {
        self.inner
            .events
            .lock()
            .iter()
            .filter(|e| matches!(e, Recorded::Data(_)))
            .count()
    }

    pub fn error_count(&self) -> usize {
        error_count(&self.inner.events.lock())
    }

    /// Apply `f` to every recorded error, in order.
    pub fn errors<T>(&self, f: impl Fn(&SerialError) -> T) -> Vec<T> {
        self.inner
            .events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Recorded::Error(err) => Some(f(err)),
                Recorded::Data(_) => None,
            })
            .collect()
    }

    /// Event kinds in delivery order, e.g. `["data", "error", "data"]`.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.inner
            .events
            .lock()
            .iter()
            .map(|e| match e {
                Recorded::Data(_) => "data",
                Recorded::Error(_) => "error",
            })
            .collect()
    }
}

/// Concatenated data of `events`; usable inside `wait_for` predicates.
pub fn data_of(events: &[Recorded]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            Recorded::Data(d) => Some(d.as_slice()),
            Recorded::Error(_) => None,
        })
        .flatten()
        .copied()
        .collect()
}

fn error_count(events: &[Recorded]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Recorded::Error(_)))
        .count()
}

/// Spawn a session on `mock` with default settings, recording into `log`.
pub fn mock_session(path: &str, mock: &MockSerialPort, log: &EventLog) -> OpenPort {
    mock_session_with(path, mock, log, PartialSettings::default())
}

pub fn mock_session_with(
    path: &str,
    mock: &MockSerialPort,
    log: &EventLog,
    settings: PartialSettings,
) -> OpenPort {
    SessionBuilder::new(path)
        .settings(settings)
        .opener(mock.clone())
        .spawn(log.clone())
        .expect("settings should resolve")
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn eventually(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}
