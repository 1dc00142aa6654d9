//! Cosmetic upload progress.
//!
//! The upload request does not report transferred bytes, so the indicator
//! creeps toward `CEILING` on a timer and only reaches 100 once the request
//! resolves. The value says nothing about the real transfer and must not
//! drive any decision.

use std::time::Duration;

pub const TICK: Duration = Duration::from_millis(150);
pub const STEP: u8 = 5;
pub const CEILING: u8 = 95;
/// How long a finished bar stays on screen.
pub const HOLD: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatedProgress {
    value: u8,
    visible: bool,
}

impl SimulatedProgress {
    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn start(&mut self) {
        self.value = 0;
        self.visible = true;
    }

    /// Advance one step, never past the ceiling.
    pub fn tick(&mut self) -> u8 {
        self.value = self.value.saturating_add(STEP).min(CEILING);
        self.value
    }

    pub fn complete(&mut self) {
        self.value = 100;
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }
}
