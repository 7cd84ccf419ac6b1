//! The caller's side of a session.

use super::event::EventSink;
use super::worker::{Worker, WorkerOptions};
use super::{SessionShared, SessionState};
use crate::error::{SerialError, SerialResult};
use crate::port::{PortError, PortOpener, SystemOpener};
use crate::settings::PartialSettings;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, warn};

/// Configures and starts a session.
///
/// ```no_run
/// use serial_session::{PartialSettings, SessionBuilder, SessionEvent};
/// use tokio::sync::mpsc;
///
/// let (tx, _events) = mpsc::unbounded_channel::<SessionEvent>();
/// let port = SessionBuilder::new("/dev/ttyACM0")
///     .settings(PartialSettings { baud_rate: Some(9600), ..Default::default() })
///     .spawn(tx)?;
/// port.write(b"ping\n".to_vec())?;
/// # Ok::<(), serial_session::SerialError>(())
/// ```
pub struct SessionBuilder {
    path: String,
    settings: PartialSettings,
    options: WorkerOptions,
    opener: Box<dyn PortOpener>,
}

impl SessionBuilder {
    /// Builder for `path` with default settings, opening real hardware.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            settings: PartialSettings::default(),
            options: WorkerOptions::default(),
            opener: Box::new(SystemOpener),
        }
    }

    pub fn settings(mut self, settings: PartialSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn options(mut self, options: WorkerOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace how the device is opened (mock devices, custom transports).
    pub fn opener(mut self, opener: impl PortOpener) -> Self {
        self.opener = Box::new(opener);
        self
    }

    /// Resolve settings and start the worker.
    ///
    /// Returns as soon as the worker thread exists; the device is opened on
    /// that thread and an open failure reaches `sink` as a single
    /// [`SerialError::Open`].
    ///
    /// # Errors
    ///
    /// - `SerialError::InvalidSettings` before any device access
    /// - `SerialError::Open` if the OS refuses to start the worker thread
    pub fn spawn(self, sink: impl EventSink) -> SerialResult<OpenPort> {
        let settings = self.settings.resolve()?;
        let shared = Arc::new(SessionShared::new());
        let (writes_tx, writes_rx) = mpsc::unbounded_channel();

        let worker = Worker {
            path: self.path.clone(),
            settings,
            options: self.options,
            opener: self.opener,
            writes: writes_rx,
            shared: Arc::clone(&shared),
            sink,
        };

        let handle = thread::Builder::new()
            .name(format!("serial-session:{}", self.path))
            .spawn(move || worker.run())
            .map_err(|e| SerialError::Open {
                path: self.path.clone(),
                source: PortError::Io(e),
            })?;

        debug!("Started worker for {}", self.path);
        Ok(OpenPort {
            path: self.path,
            shared,
            writes: writes_tx,
            worker_thread: handle.thread().id(),
            worker: Mutex::new(Some(handle)),
        })
    }
}

/// Caller handle for one open session.
///
/// Dropping the handle closes the session.
#[derive(Debug)]
pub struct OpenPort {
    path: String,
    shared: Arc<SessionShared>,
    writes: UnboundedSender<Vec<u8>>,
    worker_thread: ThreadId,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl OpenPort {
    /// Device path this session was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// True once the session can no longer accept writes.
    pub fn is_closed(&self) -> bool {
        self.shared.stop_requested() || self.shared.state() == SessionState::Closed
    }

    /// Queue bytes for transmission. Never blocks.
    ///
    /// Writes reach the device in the order they were queued.
    ///
    /// # Errors
    ///
    /// `SerialError::Closed` after `close()`, after the device failed to
    /// open, or after a fatal device error ended the session.
    pub fn write(&self, data: impl Into<Vec<u8>>) -> SerialResult<()> {
        if self.is_closed() {
            return Err(SerialError::Closed);
        }
        self.writes
            .send(data.into())
            .map_err(|_| SerialError::Closed)
    }

    /// Stop the worker and wait until it has released the device.
    ///
    /// Idempotent. Waits at most one read timeout plus the time to flush
    /// writes queued before the call. From inside one of this session's own
    /// callbacks it only signals the worker, which exits after the callback
    /// returns.
    pub fn close(&self) {
        self.shared.request_stop();

        if thread::current().id() == self.worker_thread {
            debug!("close() on {} from its own worker; not waiting", self.path);
            return;
        }

        let mut worker = self.worker.lock();
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                warn!("Worker for {} panicked; device released", self.path);
            }
        }
    }
}

impl Drop for OpenPort {
    fn drop(&mut self) {
        self.close();
    }
}
