//! Port settings: the caller-facing partial form and its resolved form.
//!
//! [`PartialSettings`] is what a caller hands in (every field optional, numbers
//! wide enough to carry out-of-range input from a host boundary or a config
//! file). [`PartialSettings::resolve`] validates it and fills the gaps,
//! producing the [`ResolvedSettings`] the worker opens the device with.

use crate::error::{SerialError, SerialResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default baud rate (115200 bps).
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default read timeout in milliseconds. This also bounds close latency.
pub const DEFAULT_TIMEOUT_MS: u64 = 10;

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    One,
    Two,
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

impl FromStr for DataBits {
    type Err = SerialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "5" | "five" => Ok(Self::Five),
            "6" | "six" => Ok(Self::Six),
            "7" | "seven" => Ok(Self::Seven),
            "8" | "eight" => Ok(Self::Eight),
            _ => Err(SerialError::invalid_settings(
                "data_bits",
                format!("'{s}' is not one of 5, 6, 7, 8"),
            )),
        }
    }
}

impl FromStr for Parity {
    type Err = SerialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "odd" | "o" => Ok(Self::Odd),
            "even" | "e" => Ok(Self::Even),
            _ => Err(SerialError::invalid_settings(
                "parity",
                format!("'{s}' is not one of none, odd, even"),
            )),
        }
    }
}

impl FromStr for StopBits {
    type Err = SerialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "one" => Ok(Self::One),
            "2" | "two" => Ok(Self::Two),
            _ => Err(SerialError::invalid_settings(
                "stop_bits",
                format!("'{s}' is not one of 1, 2"),
            )),
        }
    }
}

impl FromStr for FlowControl {
    type Err = SerialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "software" | "xonxoff" => Ok(Self::Software),
            "hardware" | "rtscts" => Ok(Self::Hardware),
            _ => Err(SerialError::invalid_settings(
                "flow_control",
                format!("'{s}' is not one of none, software, hardware"),
            )),
        }
    }
}

impl fmt::Display for DataBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = match self {
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
        };
        write!(f, "{bits}")
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "N",
            Self::Odd => "O",
            Self::Even => "E",
        })
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::One => "1",
            Self::Two => "2",
        })
    }
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Software => "software",
            Self::Hardware => "hardware",
        })
    }
}

/// Caller-supplied settings. Omitted fields take their documented default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<i64>,
    /// Read timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_bits: Option<DataBits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parity: Option<Parity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_bits: Option<StopBits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_control: Option<FlowControl>,
    /// Request exclusive access to the TTY (unix only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive: Option<bool>,
}

impl PartialSettings {
    /// Layer `self` over `fallback`: fields set here win.
    pub fn or(&self, fallback: &PartialSettings) -> PartialSettings {
        PartialSettings {
            baud_rate: self.baud_rate.or(fallback.baud_rate),
            timeout_ms: self.timeout_ms.or(fallback.timeout_ms),
            data_bits: self.data_bits.or(fallback.data_bits),
            parity: self.parity.or(fallback.parity),
            stop_bits: self.stop_bits.or(fallback.stop_bits),
            flow_control: self.flow_control.or(fallback.flow_control),
            exclusive: self.exclusive.or(fallback.exclusive),
        }
    }

    /// Validate and fill every omitted field with its default.
    ///
    /// # Errors
    ///
    /// `SerialError::InvalidSettings` if the baud rate is not a positive
    /// integer that fits in `u32`, or the timeout is not positive. A zero
    /// timeout would block reads forever, and the worker only sees the stop
    /// flag between reads.
    pub fn resolve(&self) -> SerialResult<ResolvedSettings> {
        let defaults = ResolvedSettings::default();

        let baud_rate = match self.baud_rate {
            None => defaults.baud_rate,
            Some(baud) => u32::try_from(baud)
                .ok()
                .filter(|b| *b > 0)
                .ok_or_else(|| {
                    SerialError::invalid_settings(
                        "baud_rate",
                        format!("{baud} is not a positive integer baud rate"),
                    )
                })?,
        };

        let timeout = match self.timeout_ms {
            None => defaults.timeout,
            Some(ms) if ms > 0 => Duration::from_millis(ms as u64),
            Some(ms) => {
                return Err(SerialError::invalid_settings(
                    "timeout_ms",
                    format!("{ms} ms is not a positive timeout"),
                ))
            }
        };

        Ok(ResolvedSettings {
            baud_rate,
            timeout,
            data_bits: self.data_bits.unwrap_or(defaults.data_bits),
            parity: self.parity.unwrap_or(defaults.parity),
            stop_bits: self.stop_bits.unwrap_or(defaults.stop_bits),
            flow_control: self.flow_control.unwrap_or(defaults.flow_control),
            exclusive: self.exclusive.unwrap_or(defaults.exclusive),
        })
    }
}

/// Fully concrete settings, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub baud_rate: u32,
    pub timeout: Duration,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    pub exclusive: bool,
}

impl Default for ResolvedSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            exclusive: false,
        }
    }
}

impl fmt::Display for ResolvedSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}{} flow={} timeout={:?}",
            self.baud_rate,
            self.data_bits,
            self.parity,
            self.stop_bits,
            self.flow_control,
            self.timeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_settings_resolve_to_defaults() {
        let resolved = PartialSettings::default().resolve().unwrap();
        assert_eq!(resolved.baud_rate, 115_200);
        assert_eq!(resolved.timeout, Duration::from_millis(10));
        assert_eq!(resolved.data_bits, DataBits::Eight);
        assert_eq!(resolved.parity, Parity::None);
        assert_eq!(resolved.stop_bits, StopBits::One);
        assert_eq!(resolved.flow_control, FlowControl::None);
        assert!(!resolved.exclusive);
        assert_eq!(resolved, ResolvedSettings::default());
    }

    #[test]
    fn test_provided_fields_are_kept() {
        let partial = PartialSettings {
            baud_rate: Some(9600),
            parity: Some(Parity::Even),
            stop_bits: Some(StopBits::Two),
            ..Default::default()
        };
        let resolved = partial.resolve().unwrap();
        assert_eq!(resolved.baud_rate, 9600);
        assert_eq!(resolved.parity, Parity::Even);
        assert_eq!(resolved.stop_bits, StopBits::Two);
        assert_eq!(resolved.data_bits, DataBits::Eight);
    }

    #[test]
    fn test_negative_baud_rejected() {
        let partial = PartialSettings {
            baud_rate: Some(-1),
            ..Default::default()
        };
        let err = partial.resolve().unwrap_err();
        assert!(matches!(
            err,
            SerialError::InvalidSettings {
                field: "baud_rate",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_and_oversized_baud_rejected() {
        for baud in [0, i64::from(u32::MAX) + 1] {
            let partial = PartialSettings {
                baud_rate: Some(baud),
                ..Default::default()
            };
            assert!(partial.resolve().is_err(), "baud {baud} should be rejected");
        }
    }

    #[test]
    fn test_non_positive_timeout_rejected() {
        for ms in [0, -5] {
            let partial = PartialSettings {
                timeout_ms: Some(ms),
                ..Default::default()
            };
            assert!(matches!(
                partial.resolve(),
                Err(SerialError::InvalidSettings {
                    field: "timeout_ms",
                    ..
                })
            ));
        }

        let err = PartialSettings {
            timeout_ms: Some(0),
            ..Default::default()
        }
        .resolve()
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid setting 'timeout_ms': 0 ms is not a positive timeout"
        );
    }

    #[test]
    fn test_resolve_does_not_mutate_input() {
        let partial = PartialSettings {
            timeout_ms: Some(25),
            ..Default::default()
        };
        let before = partial.clone();
        let _ = partial.resolve().unwrap();
        assert_eq!(partial, before);
    }

    #[test]
    fn test_layering_prefers_caller_fields() {
        let caller = PartialSettings {
            baud_rate: Some(57_600),
            ..Default::default()
        };
        let configured = PartialSettings {
            baud_rate: Some(9600),
            flow_control: Some(FlowControl::Hardware),
            ..Default::default()
        };
        let merged = caller.or(&configured);
        assert_eq!(merged.baud_rate, Some(57_600));
        assert_eq!(merged.flow_control, Some(FlowControl::Hardware));
    }

    #[test]
    fn test_option_parsing() {
        assert_eq!("7".parse::<DataBits>().unwrap(), DataBits::Seven);
        assert_eq!("Even".parse::<Parity>().unwrap(), Parity::Even);
        assert_eq!("two".parse::<StopBits>().unwrap(), StopBits::Two);
        assert_eq!("rtscts".parse::<FlowControl>().unwrap(), FlowControl::Hardware);
        assert!("9".parse::<DataBits>().is_err());
        assert!("mark".parse::<Parity>().is_err());
    }

    #[test]
    fn test_display_is_compact() {
        assert_eq!(
            ResolvedSettings::default().to_string(),
            "115200 8N1 flow=none timeout=10ms"
        );
    }

    #[test]
    fn test_serialport_conversions() {
        let bits: serialport::DataBits = DataBits::Eight.into();
        assert_eq!(bits, serialport::DataBits::Eight);
        let flow: serialport::FlowControl = FlowControl::Hardware.into();
        assert_eq!(flow, serialport::FlowControl::Hardware);
        let parity: serialport::Parity = Parity::Even.into();
        assert_eq!(parity, serialport::Parity::Even);
        let stop: serialport::StopBits = StopBits::Two.into();
        assert_eq!(stop, serialport::StopBits::Two);
    }
}
