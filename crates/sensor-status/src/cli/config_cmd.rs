//! `config` subcommand — show current configuration, file path and problems.

use std::path::Path;

use super::{
    Config, ConfigOutput, Result, SensorStatusError, kv, kv_indent, kv_width, load_config,
};

/// Copy of `config` safe to print: the token is masked.
fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    if !shown.token.is_empty() {
        shown.token = "********".into();
    }
    shown
}

/// Write a default config file to `custom_path` (or the default location).
pub(super) fn cmd_init(custom_path: Option<&Path>) -> Result<()> {
    let path = custom_path
        .map(|p| p.to_path_buf())
        .or_else(Config::path)
        .ok_or_else(|| SensorStatusError::Config("no config directory".into()))?;
    if path.exists() {
        return Err(SensorStatusError::Config(format!(
            "{} already exists",
            path.display()
        )));
    }
    Config::default().save_to(&path)?;
    log::info!("wrote {}", path.display());
    Ok(())
}

pub(super) fn cmd_config(json: bool, custom_path: Option<&Path>) -> Result<()> {
    let config = load_config(custom_path);
    let config_path = custom_path.map(|p| p.to_path_buf()).or_else(Config::path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());
    let problems: Vec<String> = match config.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
    };

    if json {
        let output = ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: redacted(&config),
            problems,
        };
        let json_str = serde_json::to_string_pretty(&output).map_err(|e| {
            SensorStatusError::Config(format!(
                "JSON serialization failed: {e}"
            ))
        })?;
        println!("{json_str}");
        return Ok(());
    }

    let w = kv_width(
        &["Config file:"],
        &[
            "url:",
            "token:",
            "bg_color:",
            "displays:",
            "poll_interval_ms:",
            "vlog:",
        ],
    );

    match &config_path {
        Some(p) if config_exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Settings:");
    kv_indent("url:", &config.url, w);
    let token = if !config.resolved_token().is_empty() {
        "set"
    } else {
        "(missing)"
    };
    kv_indent("token:", token, w);
    kv_indent("bg_color:", &config.bg_color, w);
    kv_indent("displays:", config.displays.join(", "), w);
    kv_indent("poll_interval_ms:", config.poll_interval_ms, w);
    kv_indent("vlog:", config.vlog, w);
    println!();

    println!("State colors:");
    let mut states: Vec<_> = config.state_colors.iter().collect();
    states.sort();
    for (state, color) in states {
        kv_indent(&format!("{state}:"), color, w);
    }
    println!();

    println!("Sensors:");
    for (led, sensors) in &config.sensors {
        kv_indent(&format!("LED {led}:"), sensors.join(", "), w);
    }

    if !problems.is_empty() {
        println!();
        println!("Problems:");
        for p in &problems {
            println!("  {p}");
        }
    }
    Ok(())
}
