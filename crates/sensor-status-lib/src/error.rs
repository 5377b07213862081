//! Unified error type for the sensor-status-lib crate.
//!
//! [`SensorStatusError`] wraps module-specific errors (`HassError`) and
//! domain-specific error kinds (`Config`, `Color`). `From` impls allow `?`
//! to propagate across module boundaries.

use std::fmt;

use crate::hass::HassError;

/// Unified error type for sensor-status-lib operations.
#[derive(Debug)]
pub enum SensorStatusError {
    /// Home Assistant communication error (HTTP, auth, decoding).
    Hass(HassError),
    /// Standard I/O error (config persistence).
    Io(std::io::Error),
    /// Configuration validation error.
    Config(String),
    /// Color parsing error.
    Color(String),
}

impl fmt::Display for SensorStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorStatusError::Hass(e) => write!(f, "{e}"),
            SensorStatusError::Io(e) => write!(f, "I/O error: {e}"),
            SensorStatusError::Config(e) => write!(f, "Config error: {e}"),
            SensorStatusError::Color(e) => write!(f, "Color error: {e}"),
        }
    }
}

impl std::error::Error for SensorStatusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SensorStatusError::Hass(e) => Some(e),
            SensorStatusError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HassError> for SensorStatusError {
    fn from(e: HassError) -> Self {
        SensorStatusError::Hass(e)
    }
}

impl From<std::io::Error> for SensorStatusError {
    fn from(e: std::io::Error) -> Self {
        SensorStatusError::Io(e)
    }
}

/// Crate-level Result alias using [`SensorStatusError`].
pub type Result<T> = std::result::Result<T, SensorStatusError>;
