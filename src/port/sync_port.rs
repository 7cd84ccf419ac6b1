//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own `SerialDevice`
//! trait so the session worker can drive real hardware and mocks alike.

use super::error::PortError;
use super::traits::{PortOpener, SerialDevice};
use crate::settings::ResolvedSettings;
use std::io::{Read, Write};

/// Synchronous serial port implementation wrapping `serialport::SerialPort`.
pub struct SyncSerialPort {
    /// The underlying serial port implementation.
    port: Box<dyn serialport::SerialPort>,
    /// The port name/path for identification.
    name: String,
}

impl SyncSerialPort {
    /// Open a serial port with the given settings.
    ///
    /// # Arguments
    /// * `port_name` - The system path to the serial port (e.g., "/dev/ttyUSB0" or "COM3")
    /// * `settings` - Resolved line settings; the read timeout comes from here
    ///
    /// # Example
    /// ```no_run
    /// use serial_session::port::SyncSerialPort;
    /// use serial_session::settings::ResolvedSettings;
    ///
    /// let port = SyncSerialPort::open("/dev/ttyUSB0", &ResolvedSettings::default())?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(port_name: &str, settings: &ResolvedSettings) -> Result<Self, PortError> {
        let builder = serialport::new(port_name, settings.baud_rate)
            .data_bits(settings.data_bits.into())
            .flow_control(settings.flow_control.into())
            .parity(settings.parity.into())
            .stop_bits(settings.stop_bits.into())
            .timeout(settings.timeout);

        let port = open_builder(builder, settings.exclusive).map_err(|e| match e.kind() {
            serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
            serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
            _ => PortError::Serial(e),
        })?;

        Ok(Self {
            port,
            name: port_name.to_string(),
        })
    }

    /// Get a reference to the underlying serialport implementation.
    pub fn as_raw(&self) -> &dyn serialport::SerialPort {
        &*self.port
    }
}

// TTY ports are opened exclusive by serialport; callers opt back in via
// `exclusive`. COM ports have no such switch.
#[cfg(unix)]
fn open_builder(
    builder: serialport::SerialPortBuilder,
    exclusive: bool,
) -> Result<Box<dyn serialport::SerialPort>, serialport::Error> {
    let mut port = builder.open_native()?;
    port.set_exclusive(exclusive)?;
    Ok(Box::new(port))
}

#[cfg(not(unix))]
fn open_builder(
    builder: serialport::SerialPortBuilder,
    _exclusive: bool,
) -> Result<Box<dyn serialport::SerialPort>, serialport::Error> {
    builder.open()
}

impl SerialDevice for SyncSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.port.write(data).map_err(PortError::Io)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.port.read(buffer).map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn flush(&mut self) -> Result<(), PortError> {
        self.port.flush().map_err(PortError::Io)
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate())
            .finish()
    }
}

/// Opens real hardware through the `serialport` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl PortOpener for SystemOpener {
    fn open(
        &self,
        path: &str,
        settings: &ResolvedSettings,
    ) -> Result<Box<dyn SerialDevice>, PortError> {
        Ok(Box::new(SyncSerialPort::open(path, settings)?))
    }
}
