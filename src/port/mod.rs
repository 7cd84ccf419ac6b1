//! Device abstraction layer for serial communication.
//!
//! Provides the traits the session worker drives, a real implementation backed
//! by the `serialport` crate, and a scriptable mock for tests.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::{Fault, PortError};
pub use mock::MockSerialPort;
pub use sync_port::{SyncSerialPort, SystemOpener};
pub use traits::{PortOpener, SerialDevice};
