//! The per-session worker: sole owner of one opened device.
//!
//! Each iteration reads once (bounded by the port timeout), drains every
//! queued write in FIFO order, then checks the stop flag. Faults are
//! reclassified into [`SerialError`] and handed to the sink; none of them
//! escape the worker thread.

use super::event::EventSink;
use super::{SessionShared, SessionState};
use crate::error::SerialError;
use crate::port::{Fault, PortError, PortOpener, SerialDevice};
use crate::settings::ResolvedSettings;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, trace, warn};

/// Tuning knobs for session workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerOptions {
    /// Largest chunk handed to a single data callback.
    pub read_buffer_size: usize,
    /// Consecutive non-fatal read failures tolerated before the device is
    /// treated as gone; the next one ends the session. Back-to-back
    /// zero-byte reads count the same way, since a blocking device only
    /// returns nothing at end of file. Zero disables escalation.
    pub max_consecutive_io_errors: u32,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            read_buffer_size: 1024,
            max_consecutive_io_errors: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Stopped,
    Fatal,
}

pub(crate) struct Worker<S> {
    pub(crate) path: String,
    pub(crate) settings: ResolvedSettings,
    pub(crate) options: WorkerOptions,
    pub(crate) opener: Box<dyn PortOpener>,
    pub(crate) writes: UnboundedReceiver<Vec<u8>>,
    pub(crate) shared: Arc<SessionShared>,
    pub(crate) sink: S,
}

/// Marks the session Closed however the worker exits, including by a
/// panicking callback.
struct MarkClosed(Arc<SessionShared>);

impl Drop for MarkClosed {
    fn drop(&mut self) {
        self.0.set_state(SessionState::Closed);
    }
}

impl<S: EventSink> Worker<S> {
    pub(crate) fn run(mut self) {
        let _closed = MarkClosed(Arc::clone(&self.shared));

        let mut device = match self.opener.open(&self.path, &self.settings) {
            Ok(device) => device,
            Err(source) => {
                warn!("Failed to open {}: {}", self.path, source);
                self.writes.close();
                self.emit_error(SerialError::Open {
                    path: self.path.clone(),
                    source,
                });
                return;
            }
        };

        self.shared.set_state(SessionState::Running);
        info!("Opened {} ({})", self.path, self.settings);

        let exit = self.run_loop(device.as_mut());

        self.writes.close();
        self.shared.set_state(SessionState::Closing);
        if exit == Exit::Stopped {
            self.flush_pending(device.as_mut());
        }
        drop(device);
        info!("Closed {} ({:?})", self.path, exit);
    }

    fn run_loop(&mut self, device: &mut dyn SerialDevice) -> Exit {
        let mut buffer = vec![0u8; self.options.read_buffer_size.max(1)];
        let mut io_errors = 0u32;
        let mut empty_reads = 0u32;

        loop {
            match device.read_bytes(&mut buffer) {
                Ok(0) => {
                    empty_reads += 1;
                    if self.exceeds_error_limit(empty_reads) {
                        warn!("{} empty reads in a row on {}", empty_reads, self.path);
                        return self.fatal(PortError::Io(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "device keeps returning end of file",
                        )));
                    }
                }
                Ok(n) => {
                    io_errors = 0;
                    empty_reads = 0;
                    trace!("Read {} bytes from {}", n, self.path);
                    self.emit_data(buffer[..n].to_vec());
                }
                Err(err) => match err.fault() {
                    Fault::Timeout => {
                        io_errors = 0;
                        empty_reads = 0;
                    }
                    Fault::Transient => {
                        io_errors += 1;
                        if self.exceeds_error_limit(io_errors) {
                            warn!(
                                "{} consecutive read errors on {}, giving up: {}",
                                io_errors, self.path, err
                            );
                            return self.fatal(err);
                        }
                        debug!("Read error on {}: {}", self.path, err);
                        self.emit_error(SerialError::Io(err));
                    }
                    Fault::Fatal => {
                        warn!("Device {} unreachable: {}", self.path, err);
                        return self.fatal(err);
                    }
                },
            }

            while let Ok(data) = self.writes.try_recv() {
                match device.write_all(&data) {
                    Ok(()) => trace!("Wrote {} bytes to {}", data.len(), self.path),
                    Err(err) if err.is_fatal() => {
                        warn!("Write to {} failed fatally: {}", self.path, err);
                        return self.fatal(err);
                    }
                    Err(err) => {
                        debug!("Write error on {}: {}", self.path, err);
                        self.emit_error(SerialError::Io(err));
                    }
                }
            }

            if self.shared.stop_requested() {
                return Exit::Stopped;
            }
        }
    }

    fn exceeds_error_limit(&self, count: u32) -> bool {
        let limit = self.options.max_consecutive_io_errors;
        limit > 0 && count > limit
    }

    // Writes are refused before the caller hears about the failure.
    fn fatal(&mut self, err: PortError) -> Exit {
        self.writes.close();
        self.emit_error(SerialError::FatalDevice(err));
        Exit::Fatal
    }

    /// Best-effort delivery of writes queued before close(). Failures are
    /// logged only: the caller has stopped listening.
    fn flush_pending(&mut self, device: &mut dyn SerialDevice) {
        let mut flushed = 0usize;
        while let Ok(data) = self.writes.try_recv() {
            if let Err(err) = device.write_all(&data) {
                debug!("Dropping queued writes to {}: {}", self.path, err);
                if err.is_fatal() {
                    return;
                }
                continue;
            }
            flushed += 1;
        }
        if let Err(err) = device.flush() {
            debug!("Flush on close failed for {}: {}", self.path, err);
        }
        if flushed > 0 {
            debug!("Flushed {} queued writes to {} on close", flushed, self.path);
        }
    }

    // Nothing is delivered once the caller has asked to stop.
    fn emit_data(&mut self, data: Vec<u8>) {
        if !self.shared.stop_requested() {
            self.sink.on_data(data);
        }
    }

    fn emit_error(&mut self, error: SerialError) {
        if !self.shared.stop_requested() {
            self.sink.on_error(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockSerialPort;
    use crate::session::Callbacks;
    use parking_lot::Mutex;
    use std::thread;
    use std::time::{Duration, Instant};
    use tokio::sync::mpsc;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recording_sink(log: &Log) -> impl EventSink {
        let data_log = Arc::clone(log);
        let error_log = Arc::clone(log);
        Callbacks::new(
            move |d: Vec<u8>| data_log.lock().push(format!("data {d:?}")),
            move |e: SerialError| error_log.lock().push(format!("error {e}")),
        )
    }

    fn worker(
        port: &MockSerialPort,
        log: &Log,
        options: WorkerOptions,
    ) -> (Worker<impl EventSink>, mpsc::UnboundedSender<Vec<u8>>, Arc<SessionShared>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SessionShared::new());
        let worker = Worker {
            path: "MOCK0".into(),
            settings: ResolvedSettings::default(),
            options,
            opener: Box::new(port.clone()),
            writes: rx,
            shared: Arc::clone(&shared),
            sink: recording_sink(log),
        };
        (worker, tx, shared)
    }

    #[test]
    fn test_stop_flushes_queued_writes_without_callbacks() {
        let port = MockSerialPort::new("MOCK0");
        let log = Log::default();
        let (worker, tx, shared) = worker(&port, &log, WorkerOptions::default());

        shared.request_stop();
        tx.send(b"one".to_vec()).unwrap();
        tx.send(b"two".to_vec()).unwrap();
        port.enqueue_read(b"ignored");
        worker.run();

        assert_eq!(port.write_log(), vec![b"one".to_vec(), b"two".to_vec()]);
        assert!(log.lock().is_empty());
        assert_eq!(shared.state(), SessionState::Closed);
        assert_eq!(port.live_handles(), 0);
        assert!(tx.send(b"late".to_vec()).is_err());
    }

    #[test]
    fn test_repeated_read_errors_escalate() {
        let port = MockSerialPort::new("MOCK0");
        for _ in 0..4 {
            port.fail_next_read(PortError::config("framing"));
        }
        let log = Log::default();
        let options = WorkerOptions {
            max_consecutive_io_errors: 3,
            ..Default::default()
        };
        let (worker, _tx, shared) = worker(&port, &log, options);
        worker.run();

        let log = log.lock();
        assert_eq!(log.len(), 4);
        for entry in &log[..3] {
            assert!(entry.starts_with("error I/O error"), "{entry}");
        }
        assert!(log[3].starts_with("error Device unreachable"));
        assert_eq!(shared.state(), SessionState::Closed);
        assert_eq!(port.releases(), 1);
    }

    #[test]
    fn test_errors_up_to_the_limit_are_tolerated() {
        let port = MockSerialPort::new("MOCK0");
        port.fail_next_read(PortError::config("framing"));
        let log = Log::default();
        let options = WorkerOptions {
            max_consecutive_io_errors: 1,
            ..Default::default()
        };
        let (worker, _tx, shared) = worker(&port, &log, options);
        let handle = thread::spawn(move || worker.run());

        let deadline = Instant::now() + Duration::from_secs(2);
        while log.lock().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        // A few more read timeouts pass without escalation.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(shared.state(), SessionState::Running);

        shared.request_stop();
        handle.join().unwrap();
        let log = log.lock();
        assert_eq!(log.len(), 1);
        assert!(log[0].starts_with("error I/O error"));
    }

    /// Returns end of file on every read.
    #[derive(Debug)]
    struct EndOfFile;

    impl SerialDevice for EndOfFile {
        fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
            Ok(data.len())
        }

        fn read_bytes(&mut self, _buffer: &mut [u8]) -> Result<usize, PortError> {
            Ok(0)
        }

        fn name(&self) -> &str {
            "EOF0"
        }
    }

    #[test]
    fn test_endless_empty_reads_end_the_session() {
        let log = Log::default();
        let (_tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SessionShared::new());
        let opener = |_: &str, _: &ResolvedSettings| -> Result<Box<dyn SerialDevice>, PortError> {
            Ok(Box::new(EndOfFile))
        };
        let worker = Worker {
            path: "EOF0".into(),
            settings: ResolvedSettings::default(),
            options: WorkerOptions {
                max_consecutive_io_errors: 5,
                ..Default::default()
            },
            opener: Box::new(opener),
            writes: rx,
            shared: Arc::clone(&shared),
            sink: recording_sink(&log),
        };
        worker.run();

        let log = log.lock();
        assert_eq!(log.len(), 1);
        assert!(log[0].starts_with("error Device unreachable"), "{}", log[0]);
        assert_eq!(shared.state(), SessionState::Closed);
    }

    #[test]
    fn test_read_buffer_size_bounds_chunks() {
        let port = MockSerialPort::new("MOCK0");
        port.enqueue_read(b"abcdef");
        port.fail_next_write(PortError::disconnected("MOCK0"));
        let log = Log::default();
        let options = WorkerOptions {
            read_buffer_size: 4,
            ..Default::default()
        };
        let (worker, tx, _shared) = worker(&port, &log, options);
        // The write fails fatally on the first iteration, after one read.
        tx.send(b"x".to_vec()).unwrap();
        worker.run();

        let log = log.lock();
        assert_eq!(log[0], format!("data {:?}", b"abcd".to_vec()));
        assert!(log[1].starts_with("error Device unreachable"));
        assert_eq!(log.len(), 2);
    }
}
