//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERIAL_SESSION";

/// Config file name looked up in the working directory
const LOCAL_CONFIG_FILE_NAME: &str = "serial-session.toml";

/// Config file name inside the platform config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERIAL_SESSION_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SERIAL_SESSION_CONFIG` environment variable (explicit path)
    /// 2. `./serial-session.toml` (current directory)
    /// 3. `config.toml` in the platform config directory
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults
        if apply_env_overrides(&mut config).is_err() || config.validate().is_err() {
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to file.
    pub fn save(&self) -> ConfigResult<()> {
        let path = self
            .config_path
            .as_ref()
            .ok_or(ConfigError::NoPath)?;

        save_to_file(&self.config, path)
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }

    /// Reload configuration from file (if path is set).
    pub fn reload(&mut self) -> ConfigResult<()> {
        if let Some(ref path) = self.config_path {
            let mut config = load_from_file(path)?;
            apply_env_overrides(&mut config)?;
            config.validate()?;
            self.config = config;
        }
        Ok(())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    get_default_config_path().filter(|path| path.exists())
}

/// Get the platform config directory for this application.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "serial-session").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Read `name` (or the first of `legacy` that is set) and parse it.
fn env_value<T: FromStr>(
    name: &str,
    legacy: &[&str],
    expected: &'static str,
) -> ConfigResult<Option<T>> {
    let found = std::iter::once(name)
        .chain(legacy.iter().copied())
        .find_map(|var| std::env::var(var).ok().map(|val| (var, val)));

    match found {
        None => Ok(None),
        Some((var, val)) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env {
                var: var.to_string(),
                value: val.clone(),
                expected,
            }),
    }
}

fn env_name(key: &str) -> String {
    format!("{}_{}", ENV_PREFIX, key)
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SERIAL_SESSION_<SECTION>_<KEY>`
/// For example:
/// - `SERIAL_SESSION_SERIAL_BAUD_RATE=9600`
/// - `SERIAL_SESSION_WORKER_READ_BUFFER_SIZE=4096`
/// - `SERIAL_SESSION_TESTING_PORT=/dev/ttyUSB0` (or legacy `TEST_PORT`)
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    let defaults = &mut config.serial.defaults;
    if let Some(val) = env_value(&env_name("SERIAL_BAUD_RATE"), &[], "baud rate")? {
        defaults.baud_rate = Some(val);
    }
    if let Some(val) = env_value(&env_name("SERIAL_TIMEOUT_MS"), &[], "timeout")? {
        defaults.timeout_ms = Some(val);
    }
    if let Some(val) = env_value(&env_name("SERIAL_DATA_BITS"), &[], "data bits")? {
        defaults.data_bits = Some(val);
    }
    if let Some(val) = env_value(&env_name("SERIAL_PARITY"), &[], "parity")? {
        defaults.parity = Some(val);
    }
    if let Some(val) = env_value(&env_name("SERIAL_STOP_BITS"), &[], "stop bits")? {
        defaults.stop_bits = Some(val);
    }
    if let Some(val) = env_value(&env_name("SERIAL_FLOW_CONTROL"), &[], "flow control")? {
        defaults.flow_control = Some(val);
    }

    if let Some(val) = env_value(&env_name("WORKER_READ_BUFFER_SIZE"), &[], "buffer size")? {
        config.worker.read_buffer_size = val;
    }
    if let Some(val) = env_value(
        &env_name("WORKER_MAX_CONSECUTIVE_IO_ERRORS"),
        &[],
        "error count",
    )? {
        config.worker.max_consecutive_io_errors = val;
    }

    if let Ok(val) = std::env::var(env_name("LOGGING_LEVEL")) {
        config.logging.level = val;
    }
    if let Some(val) = env_value(&env_name("LOGGING_FORMAT"), &[], "log format")? {
        config.logging.format = val;
    }

    // Testing overrides (also support legacy TEST_PORT etc.)
    if let Ok(val) =
        std::env::var(env_name("TESTING_PORT")).or_else(|_| std::env::var("TEST_PORT"))
    {
        config.testing.port = Some(val);
    }
    if let Some(val) = env_value(&env_name("TESTING_BAUD"), &["TEST_BAUD"], "baud rate")? {
        config.testing.baud = val;
    }
    if let Some(val) = env_value(&env_name("TESTING_TIMEOUT_MS"), &["TEST_TIMEOUT"], "timeout")? {
        config.testing.timeout_ms = val;
    }
    if let Ok(val) =
        std::env::var(env_name("TESTING_LOOPBACK")).or_else(|_| std::env::var("TEST_LOOPBACK"))
    {
        config.testing.loopback_enabled = val.to_lowercase() == "true" || val == "1";
    }

    Ok(())
}
