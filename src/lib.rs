//! Serial Session Library
//!
//! Cross-platform serial port discovery and a single-worker session model for
//! talking to serial devices through callbacks.
//!
//! # Modules
//!
//! - `catalog`: port enumeration and descriptors
//! - `settings`: line settings, defaults and validation
//! - `session`: per-port worker, caller handle and event delivery
//! - `port`: device abstraction (real hardware and mock)
//! - `config`: TOML configuration with environment overrides
//! - `error`: unified error taxonomy
//!
//! # Example
//!
//! ```no_run
//! use serial_session::list_ports;
//!
//! for desc in list_ports()? {
//!     println!("{desc}");
//! }
//! # Ok::<(), serial_session::SerialError>(())
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod port;
pub mod session;
pub mod settings;

// Re-export commonly used types for convenience
pub use catalog::{describe_ports, list_ports, PortDescriptor, PortKind, UsbInfo};
pub use error::{SerialError, SerialResult};
pub use port::{MockSerialPort, PortError, PortOpener, SerialDevice, SyncSerialPort};
pub use session::{
    Callbacks, EventSink, OpenPort, SessionBuilder, SessionEvent, SessionState, WorkerOptions,
};
pub use settings::{
    DataBits, FlowControl, Parity, PartialSettings, ResolvedSettings, StopBits,
};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
