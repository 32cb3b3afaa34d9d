//! Motion commands
//!
//! Defines the single-byte commands understood by the motor controller. The
//! table in [`MotionCommand::wire_byte`] is the only place wire codes live.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Motion commands sent to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionCommand {
    /// Start the motor ('r')
    Run,

    /// De-energize the driver ('s')
    Sleep,

    /// Stop in place, keep mode and direction ('=')
    Pause,

    /// Automatic cycling mode ('a')
    ModeAuto,

    /// Manual mode ('m')
    ModeManual,

    /// One speed step up ('+')
    SpeedPlus,

    /// One speed step down ('-')
    SpeedMinus,

    /// Counter-clockwise direction ('<')
    DirCCW,

    /// Clockwise direction ('>')
    DirCW,

    /// Switch to the slow speed preset ('g')
    GoSlow,

    /// Energize and hold the current position ('P')
    HoldPosition,
}

impl MotionCommand {
    /// Every command, in wire-table order
    pub const ALL: [MotionCommand; 11] = [
        MotionCommand::Run,
        MotionCommand::Sleep,
        MotionCommand::Pause,
        MotionCommand::ModeAuto,
        MotionCommand::ModeManual,
        MotionCommand::SpeedPlus,
        MotionCommand::SpeedMinus,
        MotionCommand::DirCCW,
        MotionCommand::DirCW,
        MotionCommand::GoSlow,
        MotionCommand::HoldPosition,
    ];

    /// Get the command byte written to the wire
    pub fn wire_byte(&self) -> u8 {
        match self {
            MotionCommand::Run => b'r',
            MotionCommand::Sleep => b's',
            MotionCommand::Pause => b'=',
            MotionCommand::ModeAuto => b'a',
            MotionCommand::ModeManual => b'm',
            MotionCommand::SpeedPlus => b'+',
            MotionCommand::SpeedMinus => b'-',
            MotionCommand::DirCCW => b'<',
            MotionCommand::DirCW => b'>',
            MotionCommand::GoSlow => b'g',
            MotionCommand::HoldPosition => b'P',
        }
    }

    /// Encode the command as its one-byte wire frame
    pub fn encode(&self) -> [u8; 1] {
        [self.wire_byte()]
    }

    /// Look up the command for a wire byte
    pub fn from_wire_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.wire_byte() == byte)
    }

    /// Short human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            MotionCommand::Run => "run",
            MotionCommand::Sleep => "sleep",
            MotionCommand::Pause => "pause",
            MotionCommand::ModeAuto => "auto",
            MotionCommand::ModeManual => "manual",
            MotionCommand::SpeedPlus => "speed+",
            MotionCommand::SpeedMinus => "speed-",
            MotionCommand::DirCCW => "ccw",
            MotionCommand::DirCW => "cw",
            MotionCommand::GoSlow => "slow",
            MotionCommand::HoldPosition => "hold",
        }
    }
}

impl fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ('{}')", self.label(), self.wire_byte() as char)
    }
}
