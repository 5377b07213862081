//! `run` subcommand — poll sensor states and mirror them onto the switch LEDs.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use super::{
    BoardConfig, DisplayChange, HomeAssistant, LedUpdate, RUNNING, Result, StatusBoard,
    StateWatcher, affected_leds, connect, load_config, require_valid,
};

/// Longest uninterrupted sleep, so Ctrl+C is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

fn print_update(update: &LedUpdate) {
    if !update.changed {
        return;
    }
    println!("  LED {} -> {}", update.led, update.color);
    match update.display {
        DisplayChange::Enabled => println!("  display ON"),
        DisplayChange::Disabled => println!("  display OFF"),
        DisplayChange::Unchanged => {}
    }
}

/// Sleep for `interval`, returning early once shutdown is requested.
fn sleep_while_running(interval: Duration) {
    let deadline = Instant::now() + interval;
    while RUNNING.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

/// One poll: fetch states, diff against the last poll, recompute affected LEDs.
///
/// LEDs whose earlier write failed are recomputed on every poll until
/// applied. Errors are logged.
fn poll_cycle(
    hass: &impl HomeAssistant,
    board: &mut StatusBoard,
    watcher: &mut StateWatcher,
) -> Vec<LedUpdate> {
    let snapshot = match hass.states() {
        Ok(s) => s,
        Err(e) => {
            log::warn!("[hass] could not poll states: {e}");
            return Vec::new();
        }
    };

    let changes = watcher.diff(&snapshot);
    for change in &changes {
        board.vlog(
            3,
            format_args!(
                "callback: {} {}->{} for led {:?}",
                change.entity,
                change.old.as_deref().unwrap_or("None"),
                change.new.as_deref().unwrap_or("None"),
                change.leds
            ),
        );
    }

    let mut updates = Vec::new();
    for led in board.leds_to_refresh(&affected_leds(&changes)) {
        match board.refresh_led(hass, led, &snapshot) {
            Ok(update) => updates.push(update),
            Err(e) => log::warn!("[led] could not update LED {led}: {e}"),
        }
    }
    updates
}

/// Apply the initial LED state and prime the watcher.
fn run_setup(
    hass: &impl HomeAssistant,
    board: &mut StatusBoard,
    watcher: &mut StateWatcher,
) -> Result<()> {
    let snapshot = hass.states()?;
    let updates = board.initialize(hass, &snapshot)?;
    for update in &updates {
        print_update(update);
    }
    if !board.is_active() {
        println!("  display OFF (nothing to show)");
    }
    watcher.prime(&snapshot);
    log::info!("initialized");
    Ok(())
}

fn run_loop(
    hass: &impl HomeAssistant,
    board: &mut StatusBoard,
    watcher: &mut StateWatcher,
    interval: Duration,
) {
    while RUNNING.load(Ordering::SeqCst) {
        sleep_while_running(interval);
        if !RUNNING.load(Ordering::SeqCst) {
            break;
        }
        for update in poll_cycle(hass, board, watcher) {
            print_update(&update);
        }
    }
}

pub(super) fn cmd_run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    require_valid(&config)?;

    let board_config = BoardConfig::from_config(&config);
    let mut watcher = StateWatcher::new(&board_config.sensors);

    println!("sensor-status — mirrors sensor states onto switch status LEDs.");
    for (led, sensors) in &board_config.sensors {
        println!("  LED {led}: {}", sensors.join(", "));
    }
    println!(
        "  Watching:   {}",
        watcher.entities().collect::<Vec<_>>().join(", ")
    );
    println!("  Background: {}", board_config.bg_color);
    println!("  Displays:   {}", board_config.displays.join(", "));
    println!("Press Ctrl+C to exit.");
    println!();

    let hass = connect(&config)?;
    let info = hass.info();
    println!(
        "[hass]   {} (Home Assistant {}, {})",
        info.url, info.version, info.location_name
    );

    let mut board = StatusBoard::new(board_config);
    run_setup(&hass, &mut board, &mut watcher)?;

    println!();
    println!("Monitoring... (Ctrl+C to stop)");
    run_loop(
        &hass,
        &mut board,
        &mut watcher,
        Duration::from_millis(config.poll_interval_ms),
    );

    println!();
    println!("Done.");
    Ok(())
}
