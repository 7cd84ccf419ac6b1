//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that simulates serial device behavior without
//! requiring actual hardware. Reads block on a condition variable up to the
//! configured timeout, so a session worker driving the mock paces itself the
//! same way it would against a real TTY.

use super::error::PortError;
use super::traits::{PortOpener, SerialDevice};
use crate::settings::ResolvedSettings;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all buffers written to the port.
    write_log: Vec<Vec<u8>>,
    /// Errors returned by the next reads, before any data.
    read_faults: VecDeque<PortError>,
    /// Errors returned by the next writes.
    write_faults: VecDeque<PortError>,
    /// Loop written bytes back into the read queue.
    echo: bool,
    /// Every operation fails as if the device was unplugged.
    disconnected: bool,
    /// Opening fails as if the path did not exist.
    refuse_open: bool,
    timeout: Duration,
    open_count: usize,
    live_handles: usize,
    releases: usize,
    last_settings: Option<ResolvedSettings>,
}

impl MockPortState {
    fn try_read(&mut self, name: &str, buffer: &mut [u8]) -> Option<Result<usize, PortError>> {
        if self.disconnected {
            return Some(Err(PortError::disconnected(name.to_string())));
        }
        if let Some(err) = self.read_faults.pop_front() {
            return Some(Err(err));
        }
        if self.read_queue.is_empty() {
            return None;
        }
        let n = buffer.len().min(self.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(self.read_queue.drain(..n)) {
            *slot = byte;
        }
        Some(Ok(n))
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MockPortState>,
    data_ready: Condvar,
}

/// Mock serial port implementation for testing.
///
/// Clones share state, so a test keeps one clone to script the device while
/// the session worker owns the handle it opened.
///
/// # Example
/// ```
/// use serial_session::port::{MockSerialPort, SerialDevice};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_read(b"Hello, World!");
///
/// let mut buffer = [0u8; 13];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"Hello, World!");
///
/// port.write_bytes(b"Response").unwrap();
/// assert_eq!(port.write_log(), vec![b"Response".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    shared: Arc<Shared>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        let shared = Shared::default();
        shared.state.lock().timeout = Duration::from_millis(crate::settings::DEFAULT_TIMEOUT_MS);
        Self {
            name: name.into(),
            shared: Arc::new(shared),
        }
    }

    /// Create a mock that loops every write back to its read side.
    pub fn echo(name: impl Into<String>) -> Self {
        let port = Self::new(name);
        port.shared.state.lock().echo = true;
        port
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.shared.state.lock().read_queue.extend(data);
        self.shared.data_ready.notify_all();
    }

    /// Make the next read fail with `err`.
    pub fn fail_next_read(&self, err: PortError) {
        self.shared.state.lock().read_faults.push_back(err);
        self.shared.data_ready.notify_all();
    }

    /// Make the next write fail with `err`.
    pub fn fail_next_write(&self, err: PortError) {
        self.shared.state.lock().write_faults.push_back(err);
    }

    /// Simulate the device being unplugged.
    pub fn disconnect(&self) {
        self.shared.state.lock().disconnected = true;
        self.shared.data_ready.notify_all();
    }

    /// Make subsequent opens fail as if the device did not exist.
    pub fn refuse_open(&self) {
        self.shared.state.lock().refuse_open = true;
    }

    /// Get a copy of all buffers written to the port, in write order.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().write_log.clone()
    }

    /// All written bytes, concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.shared.state.lock().write_log.concat()
    }

    /// Number of times the port was opened through [`PortOpener`].
    pub fn open_count(&self) -> usize {
        self.shared.state.lock().open_count
    }

    /// Number of opened handles not yet released.
    pub fn live_handles(&self) -> usize {
        self.shared.state.lock().live_handles
    }

    /// Number of opened handles released so far.
    pub fn releases(&self) -> usize {
        self.shared.state.lock().releases
    }

    /// Settings the port was last opened with.
    pub fn last_settings(&self) -> Option<ResolvedSettings> {
        self.shared.state.lock().last_settings.clone()
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.shared.state.lock().read_queue.len()
    }
}

impl SerialDevice for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();

        if state.disconnected {
            return Err(PortError::disconnected(self.name.clone()));
        }
        if let Some(err) = state.write_faults.pop_front() {
            return Err(err);
        }

        state.write_log.push(data.to_vec());
        if state.echo {
            state.read_queue.extend(data);
            self.shared.data_ready.notify_all();
        }

        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();
        let deadline = Instant::now() + state.timeout;

        loop {
            if let Some(result) = state.try_read(&self.name, buffer) {
                return result;
            }
            if self
                .shared
                .data_ready
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                let timeout = state.timeout;
                return state
                    .try_read(&self.name, buffer)
                    .unwrap_or(Err(PortError::timeout(timeout)));
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl PortOpener for MockSerialPort {
    fn open(
        &self,
        path: &str,
        settings: &ResolvedSettings,
    ) -> Result<Box<dyn SerialDevice>, PortError> {
        let mut state = self.shared.state.lock();
        if state.refuse_open || path != self.name {
            return Err(PortError::not_found(path));
        }

        state.open_count += 1;
        state.live_handles += 1;
        state.timeout = settings.timeout;
        state.last_settings = Some(settings.clone());

        Ok(Box::new(MockHandle {
            port: self.clone(),
        }))
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

/// An opened mock device; dropping it counts as releasing the handle.
#[derive(Debug)]
struct MockHandle {
    port: MockSerialPort,
}

impl SerialDevice for MockHandle {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.port.write_bytes(data)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.port.read_bytes(buffer)
    }

    fn name(&self) -> &str {
        self.port.name()
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        let mut state = self.port.shared.state.lock();
        state.live_handles = state.live_handles.saturating_sub(1);
        state.releases += 1;
    }
}
