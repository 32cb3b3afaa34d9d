//! Panel readout
//!
//! The values the displays show. The decoder is stateless, so cumulative
//! state (the cycle counter above all) lives here, owned by the panel loop.

use serde::{Deserialize, Serialize};

use crate::protocol::{DecodedEvent, MotionCommand};

/// Accumulated controller state for display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelReadout {
    /// Cycles completed since the panel started
    pub cycles: u64,
    /// Last reported position in display units
    pub position: Option<i64>,
    /// Last command the operator issued
    pub last_command: Option<MotionCommand>,
}

impl PanelReadout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one poll's events in. Returns true if anything changed.
    pub fn apply(&mut self, events: &[DecodedEvent]) -> bool {
        let before = *self;
        for event in events {
            match *event {
                DecodedEvent::CycleTick => self.cycles = self.cycles.saturating_add(1),
                DecodedEvent::PositionUpdate(value) => self.position = Some(value),
            }
        }
        *self != before
    }

    pub fn record_command(&mut self, cmd: MotionCommand) {
        self.last_command = Some(cmd);
    }

    /// Clear the cycle counter, keeping position
    pub fn reset_cycles(&mut self) {
        self.cycles = 0;
    }
}
