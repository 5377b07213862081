//! `set-led` / `display` subcommands — write the switches directly.

use std::path::Path;

use super::{
    Config, DisplayState, Result, SensorStatusError, connect, led, load_config,
};

fn require_displays(config: &Config) -> Result<()> {
    if config.displays.is_empty() {
        return Err(SensorStatusError::Config(
            "no displays configured".into(),
        ));
    }
    Ok(())
}

pub(super) fn cmd_set_led(led_number: u8, color: &str, config_path: Option<&Path>) -> Result<()> {
    let color = led::parse_color(color)?;
    let config = load_config(config_path);
    require_displays(&config)?;

    let hass = connect(&config)?;
    led::set_led_color(&hass, &config.displays, led_number, color)?;
    println!(
        "LED {led_number} -> {color} on {} display(s)",
        config.displays.len()
    );
    Ok(())
}

pub(super) fn cmd_display(state: DisplayState, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    require_displays(&config)?;

    let hass = connect(&config)?;
    let enabled = state == DisplayState::On;
    led::set_display(&hass, &config.displays, enabled)?;
    println!(
        "Display {} on {} display(s)",
        if enabled { "ON" } else { "OFF" },
        config.displays.len()
    );
    Ok(())
}
