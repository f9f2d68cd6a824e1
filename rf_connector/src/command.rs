use std::sync::RwLock;

use crate::types::{Axis, Command};

/// Anything that can hand out the most recent control command.
///
/// Called from the control loop at unbounded frequency, so implementations
/// must never block on I/O.
pub trait CommandSource: Send + Sync {
    fn latest(&self) -> Command;
}

// raw range of a physical axis, used to map raw device values into [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl Default for AxisRange {
    fn default() -> Self {
        AxisRange {
            min: 0.0,
            max: 2040.0,
        }
    }
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        AxisRange { min, max }
    }

    pub fn normalize(&self, raw: f64) -> f64 {
        let span = self.max - self.min;

        // degenerate range, nothing sensible to map to
        if span == 0.0 || !span.is_finite() || raw.is_nan() {
            return 0.0;
        }

        ((raw - self.min) / span).clamp(0.0, 1.0)
    }
}

// the shared command snapshot. one writer publishes, the control loop reads a full copy
#[derive(Debug, Default)]
pub struct CommandStore {
    command: RwLock<Command>,
}

impl CommandStore {
    // replace the full snapshot
    pub fn publish(&self, command: Command) {
        let mut guard = match self.command.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = command;
    }

    // update a single channel with an already normalized value
    pub fn set_axis(&self, axis: Axis, value: f64) {
        let mut guard = match self.command.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.set(axis, value);
    }

    // update a single channel from a raw device value
    pub fn set_raw_axis(&self, axis: Axis, raw: f64, range: &AxisRange) {
        self.set_axis(axis, range.normalize(raw));
    }

    // apply several channels under one lock, so readers never see half of it
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Command),
    {
        let mut guard = match self.command.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
    }
}

impl CommandSource for CommandStore {
    fn latest(&self) -> Command {
        match self.command.read() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
