//! Configuration module for serial-session.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SERIAL_SESSION_CONFIG` environment variable (explicit path)
//! 2. `./serial-session.toml` (current directory)
//! 3. `config.toml` in the platform config directory
//!    (`~/.config/serial-session/` on Linux, `%APPDATA%\serial-session\config\` on Windows)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `SERIAL_SESSION_<SECTION>_<KEY>`
//!
//! Examples:
//! - `SERIAL_SESSION_SERIAL_BAUD_RATE=9600`
//! - `SERIAL_SESSION_WORKER_MAX_CONSECUTIVE_IO_ERRORS=0`
//! - `SERIAL_SESSION_LOGGING_FORMAT=json`
//!
//! Legacy hardware-test variables are also supported:
//! `TEST_PORT`, `TEST_BAUD`, `TEST_TIMEOUT`, `TEST_LOOPBACK`.
//!
//! # Example
//!
//! ```toml
//! [serial.defaults]
//! baud_rate = 9600
//! timeout_ms = 20
//! parity = "none"
//!
//! [serial.port_aliases]
//! gps = "/dev/ttyUSB1"
//!
//! [worker]
//! read_buffer_size = 1024
//! max_consecutive_io_errors = 8
//!
//! [logging]
//! level = "debug"
//! format = "compact"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig, TestingConfig};
