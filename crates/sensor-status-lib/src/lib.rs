//! sensor-status — mirror Home Assistant sensor states onto HomeSeer switch status LEDs.

pub mod config;
pub mod error;
pub mod hass;
pub mod led;
pub mod status;
pub mod watcher;

pub use error::SensorStatusError;
