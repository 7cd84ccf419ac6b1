//! Port catalog: what serial devices are attached right now.
//!
//! Every call asks the OS afresh; nothing is cached between calls. A single
//! unusable record is logged and skipped rather than failing the whole query.

use crate::error::{SerialError, SerialResult};
use crate::port::PortError;
use crate::session::{Callbacks, OpenPort, SessionBuilder};
use crate::settings::PartialSettings;
use serde::Serialize;
use serialport::{SerialPortInfo, SerialPortType};
use std::fmt;
use tracing::{debug, warn};

/// Bus a port is attached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    Usb,
    Bluetooth,
    Pci,
    Unknown,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Usb => "USB",
            Self::Bluetooth => "Bluetooth",
            Self::Pci => "PCI",
            Self::Unknown => "Unknown",
        })
    }
}

/// USB identity of a port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UsbInfo {
    pub vid: u16,
    pub pid: u16,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

/// Immutable snapshot of one discovered port.
///
/// `usb_info` is present exactly when `kind` is [`PortKind::Usb`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PortDescriptor {
    path: String,
    kind: PortKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    usb_info: Option<UsbInfo>,
}

impl PortDescriptor {
    /// Descriptor for a path that did not come from enumeration
    /// (pseudo-terminals, aliases, devices hidden from udev).
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: PortKind::Unknown,
            usb_info: None,
        }
    }

    /// Descriptor for a USB-attached port.
    pub fn usb(path: impl Into<String>, info: UsbInfo) -> Self {
        Self {
            path: path.into(),
            kind: PortKind::Usb,
            usb_info: Some(info),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> PortKind {
        self.kind
    }

    pub fn usb_info(&self) -> Option<&UsbInfo> {
        self.usb_info.as_ref()
    }

    /// Start a session builder for this port.
    pub fn session(&self) -> SessionBuilder {
        SessionBuilder::new(self.path.clone())
    }

    /// Open this port on a dedicated worker and return the caller's handle.
    ///
    /// Returns immediately. Open failures are reported through one `on_error`
    /// call; only invalid settings are returned here.
    ///
    /// ```no_run
    /// use serial_session::{list_ports, PartialSettings};
    ///
    /// let ports = list_ports()?;
    /// if let Some(desc) = ports.first() {
    ///     let port = desc.open(
    ///         |bytes| println!("rx {bytes:?}"),
    ///         |err| eprintln!("error: {err}"),
    ///         &PartialSettings::default(),
    ///     )?;
    ///     port.write(b"AT\r\n".to_vec())?;
    ///     port.close();
    /// }
    /// # Ok::<(), serial_session::SerialError>(())
    /// ```
    pub fn open<D, E>(
        &self,
        on_data: D,
        on_error: E,
        settings: &PartialSettings,
    ) -> SerialResult<OpenPort>
    where
        D: FnMut(Vec<u8>) + Send + 'static,
        E: FnMut(SerialError) + Send + 'static,
    {
        self.session()
            .settings(settings.clone())
            .spawn(Callbacks::new(on_data, on_error))
    }
}

impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.path, self.kind)?;
        if let Some(usb) = &self.usb_info {
            write!(f, " {:04x}:{:04x}", usb.vid, usb.pid)?;
            for field in [&usb.manufacturer, &usb.product, &usb.serial_number]
                .into_iter()
                .flatten()
            {
                write!(f, " {field}")?;
            }
        }
        Ok(())
    }
}

/// Enumerate the serial ports currently attached.
///
/// # Errors
///
/// `SerialError::Enumeration` when the OS query fails as a whole.
pub fn list_ports() -> SerialResult<Vec<PortDescriptor>> {
    let infos = serialport::available_ports()
        .map_err(|e| SerialError::Enumeration(PortError::Serial(e)))?;
    let ports = describe_ports(infos);
    debug!(count = ports.len(), "enumerated serial ports");
    Ok(ports)
}

/// Map OS port records to descriptors, skipping unusable records.
///
/// The result is sorted by path with duplicates removed, so two queries
/// against unchanged hardware compare equal.
pub fn describe_ports(infos: impl IntoIterator<Item = SerialPortInfo>) -> Vec<PortDescriptor> {
    let mut ports: Vec<PortDescriptor> = infos
        .into_iter()
        .filter_map(|info| match describe(info) {
            Ok(port) => Some(port),
            Err(reason) => {
                warn!("Skipping serial port record: {}", reason);
                None
            }
        })
        .collect();
    ports.sort();
    ports.dedup();
    ports
}

fn describe(info: SerialPortInfo) -> Result<PortDescriptor, String> {
    let path = info.port_name.trim();
    if path.is_empty() {
        return Err(format!("empty device path ({:?})", info.port_type));
    }

    let (kind, usb_info) = match info.port_type {
        SerialPortType::UsbPort(usb) => (
            PortKind::Usb,
            Some(UsbInfo {
                vid: usb.vid,
                pid: usb.pid,
                serial_number: usb.serial_number,
                manufacturer: usb.manufacturer,
                product: usb.product,
            }),
        ),
        SerialPortType::BluetoothPort => (PortKind::Bluetooth, None),
        SerialPortType::PciPort => (PortKind::Pci, None),
        SerialPortType::Unknown => (PortKind::Unknown, None),
    };

    Ok(PortDescriptor {
        path: path.to_string(),
        kind,
        usb_info,
    })
}
