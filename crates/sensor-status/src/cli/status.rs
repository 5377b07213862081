//! `status` subcommand — show Home Assistant connection and computed LED colors.

use std::path::Path;

use super::{
    BoardConfig, Config, HassInfo, HomeAssistant, LedColor, LedStatusJson, Result,
    SensorStateJson, StateSnapshot, StatusBoard, StatusOutput, connect, kv, kv_indent, kv_width,
    led, load_config,
};

/// Color and sensor states for every LED, computed without writing anything.
fn collect_led_status(board: &StatusBoard, snapshot: &StateSnapshot) -> Vec<LedStatusJson> {
    (1..=led::LED_COUNT)
        .map(|n| {
            let sensors = board
                .config()
                .sensors
                .get(&n)
                .map(|entities| {
                    entities
                        .iter()
                        .map(|entity| SensorStateJson {
                            entity: entity.clone(),
                            state: snapshot.get(entity).cloned(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            LedStatusJson {
                led: n,
                parameter: led::led_parameter(n),
                color: board.color_for(n, snapshot),
                sensors,
            }
        })
        .collect()
}

/// Query Home Assistant. Returns None when it is unreachable or misconfigured.
fn query_hass(config: &Config) -> Option<(HassInfo, StateSnapshot)> {
    let hass = match connect(config) {
        Ok(h) => h,
        Err(e) => {
            log::warn!("[hass] {e}");
            return None;
        }
    };
    match hass.states() {
        Ok(snapshot) => Some((hass.info().clone(), snapshot)),
        Err(e) => {
            log::warn!("[hass] could not read states: {e}");
            None
        }
    }
}

fn print_status(
    hass: Option<(HassInfo, StateSnapshot)>,
    config: &Config,
    json: bool,
) -> Result<()> {
    let board = StatusBoard::new(BoardConfig::from_config(config));
    let (info, leds) = match hass {
        Some((info, snapshot)) => (Some(info), collect_led_status(&board, &snapshot)),
        None => (None, Vec::new()),
    };
    let display_on = info.as_ref().map(|_| {
        let colors: Vec<LedColor> = leds.iter().map(|l| l.color).collect();
        board.would_be_active(&colors)
    });

    if json {
        let output = StatusOutput {
            version: env!("CARGO_PKG_VERSION").to_string(),
            home_assistant: info,
            leds,
            display_on,
        };
        let json_str = serde_json::to_string_pretty(&output).map_err(|e| {
            sensor_status_lib::SensorStatusError::Config(format!(
                "JSON serialization failed: {e}"
            ))
        })?;
        println!("{json_str}");
        return Ok(());
    }

    let w = kv_width(
        &["Version:", "Home Assistant:", "Display:"],
        &["URL:", "Version:", "Location:", "LED 1:"],
    );

    kv("Version:", env!("CARGO_PKG_VERSION"), w);
    println!();

    match &info {
        Some(info) => {
            kv("Home Assistant:", "CONNECTED", w);
            kv_indent("URL:", &info.url, w);
            kv_indent("Version:", &info.version, w);
            kv_indent("Location:", &info.location_name, w);
        }
        None => {
            kv("Home Assistant:", "NOT CONNECTED", w);
            kv_indent("URL:", &config.url, w);
            return Ok(());
        }
    }
    println!();

    println!("LEDs:");
    for status in &leds {
        let states: Vec<String> = status
            .sensors
            .iter()
            .map(|s| format!("{}={}", s.entity, s.state.as_deref().unwrap_or("(none)")))
            .collect();
        let value = if states.is_empty() {
            format!("{}", status.color)
        } else {
            format!("{:<8}{}", status.color.to_string(), states.join(", "))
        };
        kv_indent(&format!("LED {}:", status.led), value, w);
    }
    println!();

    let display = match display_on {
        Some(true) => "ON",
        Some(false) => "OFF",
        None => "unknown",
    };
    kv("Display:", display, w);
    Ok(())
}

pub(super) fn cmd_status(json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let hass = query_hass(&config);
    print_status(hass, &config, json)
}
