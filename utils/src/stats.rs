//! Named activity counters.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A fixed set of named counters that can be bumped through `&self`.
///
/// Names are registered up front, in display order. Updates to a name that
/// was never registered are dropped.
#[derive(Debug)]
pub struct StatsCounter {
    slots: Vec<(&'static str, AtomicU64)>,
}

impl StatsCounter {
    pub fn new(names: &[&'static str]) -> Self {
        Self {
            slots: names.iter().map(|&name| (name, AtomicU64::new(0))).collect(),
        }
    }

    fn slot(&self, name: &str) -> Option<&AtomicU64> {
        self.slots
            .iter()
            .find(|(registered, _)| *registered == name)
            .map(|(_, value)| value)
    }

    pub fn increment(&self, name: &str) {
        self.add(name, 1);
    }

    pub fn add(&self, name: &str, value: u64) {
        if value == 0 {
            return;
        }
        if let Some(slot) = self.slot(name) {
            slot.fetch_add(value, Ordering::Relaxed);
        }
    }

    /// Current value, or zero for an unregistered name.
    pub fn get(&self, name: &str) -> u64 {
        self.slot(name).map_or(0, |slot| slot.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        self.slots
            .iter()
            .map(|(name, value)| (*name, value.load(Ordering::Relaxed)))
            .collect()
    }
}

/// `name=value` pairs in registration order.
impl fmt::Display for StatsCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}={}", value.load(Ordering::Relaxed))?;
        }
        Ok(())
    }
}
