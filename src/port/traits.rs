//! Core traits for serial device abstraction.
//!
//! `SerialDevice` is what the session worker drives; `PortOpener` is how the
//! worker obtains one. Real hardware and the in-memory mock both plug in
//! here, so the worker loop is tested without a serial port attached.

use super::error::PortError;
use crate::settings::ResolvedSettings;
use std::io;

/// Blocking byte I/O on one opened device.
pub trait SerialDevice: Send + std::fmt::Debug {
    /// Write bytes to the device.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes into the provided buffer, waiting at most the configured
    /// timeout.
    ///
    /// Returns the number of bytes actually read. An expired timeout is
    /// reported as an error whose [`fault`](PortError::fault) is
    /// [`Fault::Timeout`](super::Fault::Timeout).
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this device.
    fn name(&self) -> &str;

    /// Block until buffered output has been handed to the hardware.
    fn flush(&mut self) -> Result<(), PortError> {
        Ok(())
    }

    /// Write the whole buffer, retrying short writes.
    ///
    /// A write that times out is an error here: unlike an idle read, bytes the
    /// caller asked to send did not go out.
    fn write_all(&mut self, mut data: &[u8]) -> Result<(), PortError> {
        while !data.is_empty() {
            match self.write_bytes(data) {
                Ok(0) => {
                    return Err(PortError::Io(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "device accepted zero bytes",
                    )))
                }
                Ok(n) => data = &data[n..],
                Err(PortError::Io(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Opens devices for session workers.
///
/// Called on the worker thread, so a slow open never blocks the caller.
pub trait PortOpener: Send + 'static {
    fn open(
        &self,
        path: &str,
        settings: &ResolvedSettings,
    ) -> Result<Box<dyn SerialDevice>, PortError>;
}

impl<F> PortOpener for F
where
    F: Fn(&str, &ResolvedSettings) -> Result<Box<dyn SerialDevice>, PortError> + Send + 'static,
{
    fn open(
        &self,
        path: &str,
        settings: &ResolvedSettings,
    ) -> Result<Box<dyn SerialDevice>, PortError> {
        self(path, settings)
    }
}
