//! Application configuration — TOML-based, platform-aware paths.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::led::{self, LedColor};

/// Header comment prepended to saved config files.
const CONFIG_HEADER: &str =
    "# sensor-status configuration — LED numbers (1-7) map to ordered sensor lists.\n\n";

/// Environment variable that overrides `token`.
pub const TOKEN_ENV: &str = "SENSOR_STATUS_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Home Assistant base URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Long-lived access token. Empty = read from `SENSOR_STATUS_TOKEN`.
    #[serde(default)]
    pub token: String,

    /// Color shown when no sensor of an LED reports an interesting state.
    #[serde(default = "default_bg_color")]
    pub bg_color: String,

    /// Sensor state → LED color name, e.g. `unlocked = "Red"`.
    #[serde(default)]
    pub state_colors: HashMap<String, String>,

    /// LED number (1-based, as a string key) → sensors in priority order.
    #[serde(default)]
    pub sensors: BTreeMap<String, Vec<String>>,

    /// Switch entities whose status LEDs are driven.
    #[serde(default)]
    pub displays: Vec<String>,

    /// How often sensor states are polled.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Verbosity of traced decisions (0 = quiet, 3 = every state change).
    #[serde(default)]
    pub vlog: u8,
}

fn default_url() -> String {
    "http://homeassistant.local:8123".into()
}
fn default_bg_color() -> String {
    "Off".into()
}
fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Config {
            url: default_url(),
            token: String::new(),
            bg_color: default_bg_color(),
            state_colors: HashMap::new(),
            sensors: BTreeMap::new(),
            displays: Vec::new(),
            poll_interval_ms: default_poll_interval_ms(),
            vlog: 0,
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// `url` is not an http(s) URL.
    InvalidUrl(String),
    /// `bg_color` is not a palette color.
    InvalidBackground(String),
    /// A `state_colors` entry maps to an unknown color.
    InvalidStateColor { state: String, reason: String },
    /// A `sensors` key is not an LED number 1-7.
    InvalidLed(String),
    /// An LED is configured with an empty sensor list.
    EmptySensors(String),
    /// An entity id is not of the form `domain.object_id`.
    InvalidEntity(String),
    /// No displays to drive.
    NoDisplays,
    /// `poll_interval_ms` is zero.
    ZeroPollInterval,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidUrl(url) => {
                write!(f, "Invalid url: {url} (expected http:// or https://)")
            }
            ValidationError::InvalidBackground(e) => write!(f, "Invalid bg_color: {e}"),
            ValidationError::InvalidStateColor { state, reason } => {
                write!(f, "Invalid state_colors[{state}]: {reason}")
            }
            ValidationError::InvalidLed(key) => write!(
                f,
                "Invalid sensors key \"{key}\": LED must be 1-{}",
                led::LED_COUNT
            ),
            ValidationError::EmptySensors(key) => write!(f, "sensors[{key}] has no entities"),
            ValidationError::InvalidEntity(id) => {
                write!(f, "Invalid entity id \"{id}\" (expected domain.object_id)")
            }
            ValidationError::NoDisplays => write!(f, "No displays configured"),
            ValidationError::ZeroPollInterval => write!(f, "poll_interval_ms must be > 0"),
        }
    }
}

/// Whether `id` looks like a Home Assistant entity id (`domain.object_id`).
pub fn is_entity_id(id: &str) -> bool {
    let Some((domain, object)) = id.split_once('.') else {
        return false;
    };
    let valid = |s: &str| {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    };
    valid(domain) && valid(object)
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sensor-status"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load config from disk, or return defaults if not found.
    pub fn load() -> Self {
        let (config, warnings) = Self::load_with_warnings();
        for w in &warnings {
            log::warn!("{w}");
        }
        config
    }

    /// Save config to an arbitrary path atomically (write to temp file, then rename).
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let serialized = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        let contents = format!("{CONFIG_HEADER}{serialized}");
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &contents)?;
        match std::fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Rename can fail across filesystems
                let result = std::fs::write(path, &contents);
                let _ = std::fs::remove_file(&tmp);
                result
            }
        }
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Access token, preferring the environment over the file.
    pub fn resolved_token(&self) -> String {
        match std::env::var(TOKEN_ENV) {
            Ok(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => self.token.trim().to_string(),
        }
    }

    /// Parsed background color, `Off` if unparseable.
    pub fn background(&self) -> LedColor {
        led::parse_color(&self.bg_color).unwrap_or(LedColor::Off)
    }

    /// Parsed `state_colors`; invalid entries are skipped.
    pub fn parse_state_colors(&self) -> HashMap<String, LedColor> {
        self.state_colors
            .iter()
            .filter_map(|(state, color)| {
                led::parse_color(color)
                    .ok()
                    .map(|c| (state.clone(), c))
            })
            .collect()
    }

    /// Parsed `sensors` keyed by LED number; invalid keys are skipped.
    pub fn parse_sensors(&self) -> BTreeMap<u8, Vec<String>> {
        self.sensors
            .iter()
            .filter_map(|(key, sensors)| {
                key.trim()
                    .parse::<u8>()
                    .ok()
                    .filter(|&n| led::valid_led(n))
                    .map(|n| (n, sensors.clone()))
            })
            .collect()
    }

    /// Validate the entire config, collecting all errors.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let url = self.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError::InvalidUrl(self.url.clone()));
        }

        if let Err(e) = led::parse_color(&self.bg_color) {
            errors.push(ValidationError::InvalidBackground(e.to_string()));
        }

        let mut states: Vec<_> = self.state_colors.iter().collect();
        states.sort();
        for (state, color) in states {
            if let Err(e) = led::parse_color(color) {
                errors.push(ValidationError::InvalidStateColor {
                    state: state.clone(),
                    reason: e.to_string(),
                });
            }
        }

        for (key, sensors) in &self.sensors {
            match key.trim().parse::<u8>() {
                Ok(n) if led::valid_led(n) => {}
                _ => errors.push(ValidationError::InvalidLed(key.clone())),
            }
            if sensors.is_empty() {
                errors.push(ValidationError::EmptySensors(key.clone()));
            }
            for sensor in sensors {
                if !is_entity_id(sensor) {
                    errors.push(ValidationError::InvalidEntity(sensor.clone()));
                }
            }
        }

        if self.displays.is_empty() {
            errors.push(ValidationError::NoDisplays);
        }
        for display in &self.displays {
            if !is_entity_id(display) {
                errors.push(ValidationError::InvalidEntity(display.clone()));
            }
        }

        if self.poll_interval_ms == 0 {
            errors.push(ValidationError::ZeroPollInterval);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
url = "http://ha.local:8123"
token = "abc"
bg_color = "Green"
displays = ["light.hall_switch", "light.den_switch"]

[state_colors]
unlocked = "Red"
open = "Yellow"

[sensors]
1 = ["lock.front_door", "binary_sensor.front_door"]
2 = ["lock.back_door"]
"#
    }

    fn valid_config() -> Config {
        toml::from_str(sample_toml()).unwrap()
    }

    // ── Defaults / parsing ──

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.url, "http://homeassistant.local:8123");
        assert_eq!(c.bg_color, "Off");
        assert_eq!(c.poll_interval_ms, 1000);
        assert_eq!(c.vlog, 0);
        assert!(c.sensors.is_empty());
        assert!(c.displays.is_empty());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let c: Config = toml::from_str("").unwrap();
        assert_eq!(c.url, "http://homeassistant.local:8123");
        assert_eq!(c.bg_color, "Off");
    }

    #[test]
    fn sample_toml_parses() {
        let c = valid_config();
        assert_eq!(c.bg_color, "Green");
        assert_eq!(c.displays.len(), 2);
        assert_eq!(c.state_colors["unlocked"], "Red");
        assert_eq!(
            c.sensors["1"],
            vec!["lock.front_door", "binary_sensor.front_door"]
        );
    }

    #[test]
    fn wrong_type_toml_is_error() {
        let result: std::result::Result<Config, _> = toml::from_str("poll_interval_ms = \"fast\"");
        assert!(result.is_err());
    }

    #[test]
    fn serialize_roundtrip() {
        let c = valid_config();
        let toml_str = toml::to_string_pretty(&c).unwrap();
        let c2: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(c2.sensors, c.sensors);
        assert_eq!(c2.state_colors, c.state_colors);
        assert_eq!(c2.displays, c.displays);
    }

    // ── Paths / persistence ──

    #[test]
    fn config_path_ends_with_toml() {
        if let Some(path) = Config::path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
            assert!(path.parent().unwrap().ends_with("sensor-status"));
        }
    }

    #[test]
    fn load_from_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (c, warnings) = Config::load_from(&dir.path().join("nope.toml"));
        assert!(warnings.is_empty());
        assert_eq!(c.bg_color, "Off");
    }

    #[test]
    fn load_from_malformed_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is { not valid toml").unwrap();
        let (c, warnings) = Config::load_from(&path);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("config parse error"));
        assert_eq!(c.bg_color, "Off");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        valid_config().save_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# sensor-status configuration"));
        assert!(!dir.path().join("nested").join("config.toml.tmp").exists());

        let (c, warnings) = Config::load_from(&path);
        assert!(warnings.is_empty());
        assert_eq!(c.bg_color, "Green");
        assert_eq!(c.sensors.len(), 2);
    }

    // ── Derived values ──

    #[test]
    fn background_parses_or_falls_back() {
        assert_eq!(valid_config().background(), LedColor::Green);
        let c = Config {
            bg_color: "mauve".into(),
            ..Config::default()
        };
        assert_eq!(c.background(), LedColor::Off);
    }

    #[test]
    fn parse_state_colors_skips_invalid() {
        let mut c = valid_config();
        c.state_colors.insert("jammed".into(), "plaid".into());
        let colors = c.parse_state_colors();
        assert_eq!(colors.len(), 2);
        assert_eq!(colors["unlocked"], LedColor::Red);
        assert_eq!(colors["open"], LedColor::Yellow);
    }

    #[test]
    fn parse_sensors_keys_by_led_number() {
        let mut c = valid_config();
        c.sensors.insert("9".into(), vec!["lock.attic".into()]);
        c.sensors.insert("x".into(), vec!["lock.cellar".into()]);
        let sensors = c.parse_sensors();
        assert_eq!(sensors.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(sensors[&2], vec!["lock.back_door"]);
    }

    // ── is_entity_id ──

    #[test]
    fn entity_id_shapes() {
        assert!(is_entity_id("lock.front_door"));
        assert!(is_entity_id("binary_sensor.door_2"));
        assert!(!is_entity_id("lock"));
        assert!(!is_entity_id("lock."));
        assert!(!is_entity_id(".front"));
        assert!(!is_entity_id("Lock.Front"));
        assert!(!is_entity_id("lock.front door"));
    }

    // ── validate ──

    #[test]
    fn validate_sample_ok() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_defaults_need_displays() {
        let errors = Config::default().validate().unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoDisplays]);
    }

    #[test]
    fn validate_collects_all_errors() {
        let mut c = valid_config();
        c.url = "ha.local".into();
        c.bg_color = "mauve".into();
        c.state_colors.insert("jammed".into(), "plaid".into());
        c.sensors.insert("8".into(), vec![]);
        c.displays.push("not an entity".into());
        c.poll_interval_ms = 0;

        let errors = c.validate().unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidUrl("ha.local".into())));
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::InvalidBackground(_)))
        );
        assert!(errors.iter().any(
            |e| matches!(e, ValidationError::InvalidStateColor { state, .. } if state == "jammed")
        ));
        assert!(errors.contains(&ValidationError::InvalidLed("8".into())));
        assert!(errors.contains(&ValidationError::EmptySensors("8".into())));
        assert!(errors.contains(&ValidationError::InvalidEntity("not an entity".into())));
        assert!(errors.contains(&ValidationError::ZeroPollInterval));
    }

    #[test]
    fn validate_rejects_bad_sensor_entity() {
        let mut c = valid_config();
        c.sensors.insert("3".into(), vec!["garage".into()]);
        let errors = c.validate().unwrap_err();
        assert_eq!(errors, vec![ValidationError::InvalidEntity("garage".into())]);
    }

    #[test]
    fn validation_error_display() {
        assert_eq!(
            ValidationError::InvalidLed("0".into()).to_string(),
            "Invalid sensors key \"0\": LED must be 1-7"
        );
        assert_eq!(ValidationError::NoDisplays.to_string(), "No displays configured");
    }
}
