//! Integration tests: end-to-end poll → diff → recompute → apply sequences
//! using MockHass.
//!
//! These tests drive the watcher and status board through the public API
//! the way the `run` command does, and check which configuration writes
//! reach Home Assistant and in what order.

use sensor_status_lib::config::Config;
use sensor_status_lib::hass::HomeAssistant;
use sensor_status_lib::hass::mock::MockHass;
use sensor_status_lib::led::{DISPLAY_PARAMETER, LedColor, led_parameter};
use sensor_status_lib::status::{BoardConfig, StatusBoard};
use sensor_status_lib::watcher::{StateWatcher, affected_leds};

const CONFIG: &str = r#"
bg_color = "Green"
displays = ["light.hall_switch", "light.den_switch"]

[state_colors]
unlocked = "Red"
open = "Yellow"

[sensors]
1 = ["lock.front_door", "binary_sensor.front_door"]
2 = ["lock.back_door"]
"#;

fn setup() -> (MockHass, StatusBoard, StateWatcher) {
    let config: Config = toml::from_str(CONFIG).unwrap();
    assert!(config.validate().is_ok());

    let hass = MockHass::new();
    hass.set_state("lock.front_door", "locked");
    hass.set_state("binary_sensor.front_door", "closed");
    hass.set_state("lock.back_door", "locked");
    hass.set_state("light.kitchen", "on");

    let board_config = BoardConfig::from_config(&config);
    let watcher = StateWatcher::new(&board_config.sensors);
    let board = StatusBoard::new(board_config);
    (hass, board, watcher)
}

/// One iteration of the run loop: poll, diff, recompute affected and
/// pending LEDs. Returns the LEDs that were recomputed.
fn poll_once(hass: &MockHass, board: &mut StatusBoard, watcher: &mut StateWatcher) -> Vec<u8> {
    let snapshot = hass.states().unwrap();
    let changes = watcher.diff(&snapshot);
    let leds = board.leds_to_refresh(&affected_leds(&changes));
    for &led in &leds {
        // Failures stay pending on the board
        let _ = board.refresh_led(hass, led, &snapshot);
    }
    leds
}

fn display_writes(hass: &MockHass) -> Vec<(String, u64)> {
    hass.config_writes()
        .into_iter()
        .filter(|(_, p, _)| *p == u64::from(DISPLAY_PARAMETER))
        .map(|(d, _, v)| (d, v))
        .collect()
}

#[test]
fn startup_writes_every_led_to_every_display() {
    let (hass, mut board, mut watcher) = setup();
    let snapshot = hass.states().unwrap();
    board.initialize(&hass, &snapshot).unwrap();
    watcher.prime(&snapshot);

    let writes = hass.config_writes();
    // 7 LEDs × 2 displays + proactive disable on 2 displays
    assert_eq!(writes.len(), 16);
    assert_eq!(
        writes[0],
        ("dev-light.hall_switch".to_string(), u64::from(led_parameter(1)), 2)
    );
    assert_eq!(
        writes[1],
        ("dev-light.den_switch".to_string(), u64::from(led_parameter(1)), 2)
    );
    assert_eq!(
        display_writes(&hass),
        vec![
            ("dev-light.hall_switch".to_string(), 0),
            ("dev-light.den_switch".to_string(), 0),
        ]
    );
}

#[test]
fn door_opens_and_closes() {
    let (hass, mut board, mut watcher) = setup();
    let snapshot = hass.states().unwrap();
    board.initialize(&hass, &snapshot).unwrap();
    watcher.prime(&snapshot);
    hass.clear_calls();

    // Nothing changed: nothing written
    assert!(poll_once(&hass, &mut board, &mut watcher).is_empty());
    assert!(hass.calls.borrow().is_empty());

    // Door opens → LED 1 yellow, displays on
    hass.set_state("binary_sensor.front_door", "open");
    assert_eq!(poll_once(&hass, &mut board, &mut watcher), vec![1]);
    assert_eq!(board.led_color(1), Some(LedColor::Yellow));
    assert!(board.is_active());
    assert_eq!(
        display_writes(&hass),
        vec![
            ("dev-light.hall_switch".to_string(), 1),
            ("dev-light.den_switch".to_string(), 1),
        ]
    );
    hass.clear_calls();

    // Lock also opens → higher-priority sensor takes LED 1 to red
    hass.set_state("lock.front_door", "unlocked");
    poll_once(&hass, &mut board, &mut watcher);
    assert_eq!(board.led_color(1), Some(LedColor::Red));
    assert!(display_writes(&hass).is_empty());
    hass.clear_calls();

    // Both close → back to background, displays off
    hass.set_state("lock.front_door", "locked");
    hass.set_state("binary_sensor.front_door", "closed");
    poll_once(&hass, &mut board, &mut watcher);
    assert_eq!(board.led_color(1), Some(LedColor::Green));
    assert!(!board.is_active());
    assert_eq!(
        display_writes(&hass),
        vec![
            ("dev-light.hall_switch".to_string(), 0),
            ("dev-light.den_switch".to_string(), 0),
        ]
    );
}

#[test]
fn unrelated_entity_changes_write_nothing() {
    let (hass, mut board, mut watcher) = setup();
    let snapshot = hass.states().unwrap();
    board.initialize(&hass, &snapshot).unwrap();
    watcher.prime(&snapshot);
    hass.clear_calls();

    hass.set_state("light.kitchen", "off");
    assert!(poll_once(&hass, &mut board, &mut watcher).is_empty());
    assert!(hass.calls.borrow().is_empty());
}

#[test]
fn state_change_to_same_color_writes_nothing() {
    let (hass, mut board, mut watcher) = setup();
    let snapshot = hass.states().unwrap();
    board.initialize(&hass, &snapshot).unwrap();
    watcher.prime(&snapshot);
    hass.clear_calls();

    // "jammed" has no color: LED 2 stays at background
    hass.set_state("lock.back_door", "jammed");
    assert_eq!(poll_once(&hass, &mut board, &mut watcher), vec![2]);
    assert!(hass.calls.borrow().is_empty());
}

#[test]
fn sensor_vanishing_turns_led_off() {
    let (hass, mut board, mut watcher) = setup();
    let snapshot = hass.states().unwrap();
    board.initialize(&hass, &snapshot).unwrap();
    watcher.prime(&snapshot);
    hass.clear_calls();

    hass.remove_state("lock.back_door");
    poll_once(&hass, &mut board, &mut watcher);
    assert_eq!(board.led_color(2), Some(LedColor::Off));
    assert_eq!(
        hass.config_writes(),
        vec![
            ("dev-light.hall_switch".to_string(), u64::from(led_parameter(2)), 0),
            ("dev-light.den_switch".to_string(), u64::from(led_parameter(2)), 0),
        ]
    );
}

#[test]
fn failed_write_is_retried_on_following_polls() {
    let (hass, mut board, mut watcher) = setup();
    let snapshot = hass.states().unwrap();
    board.initialize(&hass, &snapshot).unwrap();
    watcher.prime(&snapshot);

    hass.fail_calls.set(true);
    hass.set_state("lock.back_door", "unlocked");
    assert_eq!(poll_once(&hass, &mut board, &mut watcher), vec![2]);
    assert_eq!(board.led_color(2), Some(LedColor::Green));
    assert_eq!(board.pending_leds(), vec![2]);

    // No further sensor change: LED 2 is still recomputed
    hass.fail_calls.set(false);
    hass.clear_calls();
    assert_eq!(poll_once(&hass, &mut board, &mut watcher), vec![2]);
    assert_eq!(board.led_color(2), Some(LedColor::Red));
    assert!(board.pending_leds().is_empty());
    assert!(board.is_active());
    assert_eq!(
        display_writes(&hass),
        vec![
            ("dev-light.hall_switch".to_string(), 1),
            ("dev-light.den_switch".to_string(), 1),
        ]
    );

    // Applied: quiet again
    hass.clear_calls();
    assert!(poll_once(&hass, &mut board, &mut watcher).is_empty());
    assert!(hass.calls.borrow().is_empty());
}
