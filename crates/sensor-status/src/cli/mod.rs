//! CLI subcommands — LED mirroring loop, status, config, manual writes.

mod config_cmd;
mod manual;
mod run;
mod status;

use std::path::Path;

use clap::{Subcommand, ValueEnum};
use serde::Serialize;

pub(super) use crate::RUNNING;
pub(super) use sensor_status_lib::SensorStatusError;
pub(super) use sensor_status_lib::config::Config;
pub(super) use sensor_status_lib::error::Result;
pub(super) use sensor_status_lib::hass::{HassInfo, HomeAssistant, RestClient, StateSnapshot};
pub(super) use sensor_status_lib::led::{self, LedColor};
pub(super) use sensor_status_lib::status::{BoardConfig, DisplayChange, LedUpdate, StatusBoard};
pub(super) use sensor_status_lib::watcher::{StateWatcher, affected_leds};

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

/// Load config from `path` (or the default location), logging parse warnings.
pub(super) fn load_config(path: Option<&Path>) -> Config {
    let Some(path) = path else {
        return Config::load();
    };
    let (config, warnings) = Config::load_from(path);
    for w in &warnings {
        log::warn!("{w}");
    }
    config
}

/// Reject a config that cannot drive any LEDs.
pub(super) fn require_valid(config: &Config) -> Result<()> {
    config.validate().map_err(|errors| {
        let list: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        SensorStatusError::Config(list.join("; "))
    })
}

/// Connect to the configured Home Assistant instance.
pub(super) fn connect(config: &Config) -> Result<RestClient> {
    let token = config.resolved_token();
    if token.is_empty() {
        return Err(SensorStatusError::Config(format!(
            "no access token (set `token` in the config file or {})",
            sensor_status_lib::config::TOKEN_ENV
        )));
    }
    Ok(RestClient::connect(&config.url, &token)?)
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct StatusOutput {
    pub version: String,
    pub home_assistant: Option<HassInfo>,
    pub leds: Vec<LedStatusJson>,
    pub display_on: Option<bool>,
}

#[derive(Serialize)]
pub(super) struct LedStatusJson {
    pub led: u8,
    pub parameter: u8,
    pub color: LedColor,
    pub sensors: Vec<SensorStateJson>,
}

#[derive(Serialize)]
pub(super) struct SensorStateJson {
    pub entity: String,
    pub state: Option<String>,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub problems: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DisplayState {
    On,
    Off,
}

#[derive(Subcommand)]
pub enum Command {
    /// Mirror sensor states onto the switch LEDs until Ctrl+C
    Run,

    /// Show the color each LED would show right now
    Status,

    /// Show current configuration and file path
    Config {
        /// Write a default config file first (fails if one exists)
        #[arg(long)]
        init: bool,
    },

    /// Set one LED on every display
    SetLed {
        /// LED number (1-7)
        #[arg(value_parser = clap::value_parser!(u8).range(1..=7))]
        led: u8,
        /// Color name (Off, Red, Green, Blue, Magenta, Yellow, Cyan, White) or 0-7
        color: String,
    },

    /// Turn the status display on or off on every display
    Display {
        #[arg(value_enum)]
        state: DisplayState,
    },
}

/// Warn if `--json` was passed to a command that doesn't support it.
fn warn_json_unsupported(cmd_name: &str) {
    log::warn!("--json is not supported for `{cmd_name}` (ignored)");
}

pub fn run(cmd: Command, json: bool, config_path: Option<&Path>) -> Result<()> {
    match cmd {
        Command::Run => {
            if json {
                warn_json_unsupported("run");
            }
            run::cmd_run(config_path)
        }
        Command::Status => status::cmd_status(json, config_path),
        Command::Config { init } => {
            if init {
                config_cmd::cmd_init(config_path)?;
            }
            config_cmd::cmd_config(json, config_path)
        }
        Command::SetLed { led, color } => {
            if json {
                warn_json_unsupported("set-led");
            }
            manual::cmd_set_led(led, &color, config_path)
        }
        Command::Display { state } => {
            if json {
                warn_json_unsupported("display");
            }
            manual::cmd_display(state, config_path)
        }
    }
}
