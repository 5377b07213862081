//! State-change listeners over polled snapshots.
//!
//! Home Assistant is polled for a full state snapshot; the watcher diffs it
//! against the previous one and reports which subscribed sensors changed
//! and which LEDs they drive.

use std::collections::{BTreeMap, BTreeSet};

use crate::hass::StateSnapshot;

/// A subscribed sensor changed state between two polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub entity: String,
    pub old: Option<String>,
    pub new: Option<String>,
    /// LEDs driven by this sensor.
    pub leds: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct StateWatcher {
    /// Entity → LEDs it drives.
    subscriptions: BTreeMap<String, Vec<u8>>,
    /// Last seen state of each subscribed entity.
    last: BTreeMap<String, Option<String>>,
}

impl StateWatcher {
    /// Subscribe every sensor to the LED(s) it drives.
    pub fn new(sensors: &BTreeMap<u8, Vec<String>>) -> Self {
        let mut subscriptions: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for (&led, entities) in sensors {
            for entity in entities {
                let leds = subscriptions.entry(entity.clone()).or_default();
                if !leds.contains(&led) {
                    leds.push(led);
                }
            }
        }
        Self {
            subscriptions,
            last: BTreeMap::new(),
        }
    }

    /// Subscribed entity ids, sorted.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.keys().map(String::as_str)
    }

    /// Record the initial states without reporting changes.
    pub fn prime(&mut self, snapshot: &StateSnapshot) {
        for entity in self.subscriptions.keys() {
            self.last.insert(entity.clone(), snapshot.get(entity).cloned());
        }
    }

    /// Report every subscribed entity whose state differs from the last
    /// poll, and remember the new states.
    pub fn diff(&mut self, snapshot: &StateSnapshot) -> Vec<StateChange> {
        let mut changes = Vec::new();
        for (entity, leds) in &self.subscriptions {
            let new = snapshot.get(entity).cloned();
            let old = self.last.insert(entity.clone(), new.clone()).flatten();
            if old != new {
                changes.push(StateChange {
                    entity: entity.clone(),
                    old,
                    new,
                    leds: leds.clone(),
                });
            }
        }
        changes
    }
}

/// LEDs that need recomputing after `changes`, sorted and de-duplicated.
pub fn affected_leds(changes: &[StateChange]) -> Vec<u8> {
    changes
        .iter()
        .flat_map(|c| c.leds.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
