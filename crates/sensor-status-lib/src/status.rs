//! Status board — testable LED/display logic decoupled from I/O.
//!
//! The `StatusBoard` owns the last color applied to each LED and decides,
//! from a snapshot of sensor states, which color each LED should show and
//! whether the status display should be on. Writes are issued only when a
//! computed color differs from the applied one.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use crate::SensorStatusError;
use crate::config::Config;
use crate::error::Result;
use crate::hass::{HomeAssistant, StateSnapshot};
use crate::led::{self, LED_COUNT, LedColor};

/// What happened to the status display as a result of an LED update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisplayChange {
    Enabled,
    Disabled,
    Unchanged,
}

/// Outcome of [`StatusBoard::set_led`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedUpdate {
    pub led: u8,
    pub color: LedColor,
    /// False when the color was already applied and nothing was written.
    pub changed: bool,
    pub display: DisplayChange,
}

/// Resolved, typed view of the parts of [`Config`] the board needs.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub sensors: BTreeMap<u8, Vec<String>>,
    pub state_colors: HashMap<String, LedColor>,
    pub bg_color: LedColor,
    pub displays: Vec<String>,
    pub vlog: u8,
}

impl BoardConfig {
    pub fn from_config(config: &Config) -> Self {
        BoardConfig {
            sensors: config.parse_sensors(),
            state_colors: config.parse_state_colors(),
            bg_color: config.background(),
            displays: config.displays.clone(),
            vlog: config.vlog,
        }
    }
}

pub struct StatusBoard {
    config: BoardConfig,
    interesting: Vec<LedColor>,
    /// Last applied color per LED, index 0 = LED 1.
    leds: [Option<LedColor>; LED_COUNT as usize],
    /// LEDs whose last write failed and still need applying.
    pending: BTreeSet<u8>,
}

impl StatusBoard {
    pub fn new(config: BoardConfig) -> Self {
        Self {
            interesting: led::interesting_colors(config.bg_color),
            config,
            leds: [None; LED_COUNT as usize],
            pending: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Last applied color of `led`, `None` if never applied.
    pub fn led_color(&self, led: u8) -> Option<LedColor> {
        Self::slot(led).and_then(|i| self.leds[i])
    }

    fn slot(led: u8) -> Option<usize> {
        led::valid_led(led).then(|| usize::from(led - 1))
    }

    /// LEDs whose last write failed, sorted.
    pub fn pending_leds(&self) -> Vec<u8> {
        self.pending.iter().copied().collect()
    }

    /// `changed` plus every pending LED, sorted and de-duplicated.
    pub fn leds_to_refresh(&self, changed: &[u8]) -> Vec<u8> {
        let mut leds: BTreeSet<u8> = changed.iter().copied().collect();
        leds.extend(&self.pending);
        leds.into_iter().collect()
    }

    fn vlog_enabled(&self, level: u8) -> bool {
        level <= self.config.vlog
    }

    /// Verbosity-gated trace, emitted when `level <= vlog`.
    pub fn vlog(&self, level: u8, msg: impl fmt::Display) {
        if self.vlog_enabled(level) {
            log::info!("VLOG({level}): {msg}");
        }
    }

    /// Color `led` should show given the current sensor states.
    ///
    /// Sensors are scanned in priority order. A sensor with no state turns
    /// the LED off; the first state found in `state_colors` wins; otherwise
    /// the background color is shown.
    pub fn color_for(&self, led: u8, states: &StateSnapshot) -> LedColor {
        let Some(sensors) = self.config.sensors.get(&led) else {
            return LedColor::Off;
        };
        for sensor in sensors {
            let state = match states.get(sensor) {
                Some(s) if !s.is_empty() => s,
                _ => return LedColor::Off,
            };
            if let Some(&color) = self.config.state_colors.get(state) {
                return color;
            }
        }
        self.config.bg_color
    }

    /// Whether any LED currently shows an interesting color.
    pub fn is_active(&self) -> bool {
        self.leds
            .iter()
            .flatten()
            .any(|c| self.interesting.contains(c))
    }

    /// Would the display be on if every LED showed `colors`?
    pub fn would_be_active(&self, colors: &[LedColor]) -> bool {
        colors.iter().any(|c| self.interesting.contains(c))
    }

    /// Apply `color` to `led` on all displays, toggling the display on the
    /// inactive/active edges. A repeated color is a no-op.
    ///
    /// A failed write leaves the LED pending until a later call applies it.
    pub fn set_led(
        &mut self,
        hass: &impl HomeAssistant,
        led: u8,
        color: LedColor,
    ) -> Result<LedUpdate> {
        let slot = Self::slot(led).ok_or_else(|| {
            SensorStatusError::Config(format!("LED {led} is out of range (1-{LED_COUNT})"))
        })?;

        if self.leds[slot] == Some(color) {
            self.pending.remove(&led);
            return Ok(LedUpdate {
                led,
                color,
                changed: false,
                display: DisplayChange::Unchanged,
            });
        }

        log::info!("setting led {led} to {color}");
        for display in &self.config.displays {
            self.vlog(2, format_args!("setting led {led} to {color} on {display}"));
        }
        if let Err(e) = led::set_led_color(hass, &self.config.displays, led, color) {
            self.pending.insert(led);
            return Err(e.into());
        }
        self.pending.remove(&led);

        let active_before = self.is_active();
        self.leds[slot] = Some(color);
        let active_after = self.is_active();

        let display = if active_after && !active_before {
            self.enable(hass);
            DisplayChange::Enabled
        } else if active_before && !active_after {
            self.disable(hass);
            DisplayChange::Disabled
        } else {
            DisplayChange::Unchanged
        };

        Ok(LedUpdate {
            led,
            color,
            changed: true,
            display,
        })
    }

    /// Recompute `led` from `states` and apply it.
    pub fn refresh_led(
        &mut self,
        hass: &impl HomeAssistant,
        led: u8,
        states: &StateSnapshot,
    ) -> Result<LedUpdate> {
        let color = self.color_for(led, states);
        self.set_led(hass, led, color)
    }

    /// Apply every LED from `states`, then switch the display off if
    /// nothing interesting is shown.
    pub fn initialize(
        &mut self,
        hass: &impl HomeAssistant,
        states: &StateSnapshot,
    ) -> Result<Vec<LedUpdate>> {
        let mut updates = Vec::with_capacity(LED_COUNT as usize);
        for led in 1..=LED_COUNT {
            updates.push(self.refresh_led(hass, led, states)?);
        }
        if !self.is_active() {
            self.disable(hass);
        }
        Ok(updates)
    }

    /// Turn the status display on. Failures are logged.
    pub fn enable(&self, hass: &impl HomeAssistant) {
        log::info!("enabling displays");
        for display in &self.config.displays {
            self.vlog(1, format_args!("enabling display {display}"));
        }
        if let Err(e) = led::set_display(hass, &self.config.displays, true) {
            log::warn!("could not enable displays: {e}");
        }
    }

    /// Turn the status display off. Failures are logged.
    pub fn disable(&self, hass: &impl HomeAssistant) {
        log::info!("disabling displays");
        for display in &self.config.displays {
            self.vlog(1, format_args!("disabling display {display}"));
        }
        if let Err(e) = led::set_display(hass, &self.config.displays, false) {
            log::warn!("could not disable displays: {e}");
        }
    }
}
