//! LED device operations — Z-Wave configuration parameter writes.

use crate::hass::{HomeAssistant, Result};

use super::color::LedColor;

/// Number of status LEDs on an HS-W*200+ device.
pub const LED_COUNT: u8 = 7;

/// Configuration parameter that switches the status display on (1) or off (0).
pub const DISPLAY_PARAMETER: u8 = 13;

/// LED `n` (1-based) is configured through parameter `n + 20`.
const LED_PARAMETER_BASE: u8 = 20;

pub fn valid_led(led: u8) -> bool {
    (1..=LED_COUNT).contains(&led)
}

/// Configuration parameter for a 1-based LED number.
pub fn led_parameter(led: u8) -> u8 {
    led + LED_PARAMETER_BASE
}

/// Write one configuration parameter to the device behind `display`.
pub fn set_device(
    hass: &impl HomeAssistant,
    display: &str,
    parameter: u8,
    value: u8,
) -> Result<()> {
    log::debug!("setting parameter {parameter} to {value} for {display}");
    let device_id = hass.device_id(display)?;
    hass.call_service(
        "zwave_js",
        "set_config_parameter",
        &serde_json::json!({
            "device_id": device_id,
            "parameter": parameter,
            "value": value,
        }),
    )
}

/// Set one LED to `color` on every display, in order.
pub fn set_led_color(
    hass: &impl HomeAssistant,
    displays: &[String],
    led: u8,
    color: LedColor,
) -> Result<()> {
    for display in displays {
        set_device(hass, display, led_parameter(led), color.value())?;
    }
    Ok(())
}

/// Turn the status display on or off on every display.
pub fn set_display(hass: &impl HomeAssistant, displays: &[String], enabled: bool) -> Result<()> {
    for display in displays {
        set_device(hass, display, DISPLAY_PARAMETER, u8::from(enabled))?;
    }
    Ok(())
}
