//! Demo Mode - Simulated motor controller for testing
//!
//! Behaves like the real board from the link's point of view: it accepts the
//! single-byte commands, moves a virtual stepper on every [`tick`], and queues
//! the same ASCII status the firmware prints (`<microsteps>>=` reports and a
//! `.>=` per completed cycle, queued after the report so the marker never
//! lands inside a number).
//!
//! Clones share one simulated board. Hand one clone to a
//! [`PortHandle`](crate::protocol::PortHandle) and keep another to drive the
//! clock and inspect state.
//!
//! [`tick`]: DemoController::tick

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::protocol::{
    CommunicationChannel, MotionCommand, CYCLE_MARKER, MICROSTEP_FACTOR, POSITION_DELIMITER,
};

/// Microsteps travelled per completed cycle
pub const CYCLE_LENGTH: i64 = 400;

/// Speed level after power-on
pub const INITIAL_SPEED: u32 = 10;

/// Speed level selected by GoSlow
pub const SLOW_SPEED: u32 = 1;

/// Highest speed level
pub const MAX_SPEED: u32 = 40;

/// Garbage the noisy mode slips into the stream. Each ends in the delimiter
/// so genuine reports after it still decode.
const NOISE_TOKENS: [&[u8]; 4] = [b"ERR>=", b"1x2>=", b" >=", b"#>="];

/// Stepper driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverState {
    /// Driver de-energized
    Sleeping,
    /// Energized, standing still
    Holding,
    /// Moving
    Running,
    /// Stopped by Pause, resumes on a direction command
    Paused,
}

/// Operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemoMode {
    Manual,
    /// Reverses direction at the end of every cycle
    Auto,
}

struct DemoState {
    driver: DriverState,
    mode: DemoMode,
    direction: i64,
    speed: u32,
    position: i64,
    travelled: i64,
    outbound: VecDeque<u8>,
    received: Vec<MotionCommand>,
    noise: Option<(StdRng, f64)>,
}

impl DemoState {
    fn new() -> Self {
        Self {
            driver: DriverState::Sleeping,
            mode: DemoMode::Manual,
            direction: 1,
            speed: INITIAL_SPEED,
            position: 0,
            travelled: 0,
            outbound: VecDeque::new(),
            received: Vec::new(),
            noise: None,
        }
    }

    fn apply(&mut self, cmd: MotionCommand) {
        match cmd {
            MotionCommand::Run => self.driver = DriverState::Running,
            MotionCommand::Sleep => self.driver = DriverState::Sleeping,
            MotionCommand::Pause => {
                if self.driver == DriverState::Running {
                    self.driver = DriverState::Paused;
                }
            }
            MotionCommand::ModeAuto => self.mode = DemoMode::Auto,
            MotionCommand::ModeManual => self.mode = DemoMode::Manual,
            MotionCommand::SpeedPlus => self.speed = (self.speed + 1).min(MAX_SPEED),
            MotionCommand::SpeedMinus => self.speed = self.speed.saturating_sub(1),
            MotionCommand::DirCCW => self.set_direction(-1),
            MotionCommand::DirCW => self.set_direction(1),
            MotionCommand::GoSlow => self.speed = SLOW_SPEED,
            MotionCommand::HoldPosition => self.driver = DriverState::Holding,
        }
        self.received.push(cmd);
        self.report_position();
    }

    fn set_direction(&mut self, direction: i64) {
        self.direction = direction;
        if matches!(self.driver, DriverState::Holding | DriverState::Paused) {
            self.driver = DriverState::Running;
        }
    }

    fn step(&mut self) {
        if self.driver != DriverState::Running || self.speed == 0 {
            return;
        }
        let delta = self.direction * i64::from(self.speed) * MICROSTEP_FACTOR;
        self.position += delta;
        self.travelled += delta.abs();
        let mut cycles = 0;
        while self.travelled >= CYCLE_LENGTH {
            self.travelled -= CYCLE_LENGTH;
            cycles += 1;
            if self.mode == DemoMode::Auto {
                self.direction = -self.direction;
            }
        }
        self.report_position();
        for _ in 0..cycles {
            self.outbound.push_back(CYCLE_MARKER);
            self.outbound.extend(POSITION_DELIMITER.iter().copied());
        }
    }

    fn report_position(&mut self) {
        if let Some((rng, probability)) = self.noise.as_mut() {
            if rng.gen_bool(*probability) {
                let token = NOISE_TOKENS[rng.gen_range(0..NOISE_TOKENS.len())];
                self.outbound.extend(token.iter().copied());
            }
        }
        self.outbound
            .extend(self.position.to_string().as_bytes().iter().copied());
        self.outbound.extend(POSITION_DELIMITER.iter().copied());
    }
}

/// Simulated controller board
#[derive(Clone)]
pub struct DemoController {
    inner: Arc<Mutex<DemoState>>,
}

impl Default for DemoController {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoController {
    /// Create a board in its power-on state
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(DemoState::new())),
        }
    }

    /// Inject malformed tokens before reports with the given probability.
    /// Seeded so runs are reproducible.
    pub fn with_noise(self, seed: u64, probability: f64) -> Self {
        self.state().noise = Some((StdRng::seed_from_u64(seed), probability.clamp(0.0, 1.0)));
        self
    }

    fn state(&self) -> MutexGuard<'_, DemoState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance the simulation by one step
    pub fn tick(&self) {
        self.state().step();
    }

    pub fn tick_n(&self, n: usize) {
        let mut state = self.state();
        for _ in 0..n {
            state.step();
        }
    }

    /// Raw position in microsteps
    pub fn position(&self) -> i64 {
        self.state().position
    }

    pub fn speed(&self) -> u32 {
        self.state().speed
    }

    pub fn driver_state(&self) -> DriverState {
        self.state().driver
    }

    pub fn mode(&self) -> DemoMode {
        self.state().mode
    }

    /// Commands received so far, in order
    pub fn received_commands(&self) -> Vec<MotionCommand> {
        self.state().received.clone()
    }

    /// Bytes queued for the host
    pub fn pending_output(&self) -> usize {
        self.state().outbound.len()
    }
}

impl Read for DemoController {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        let n = buf.len().min(state.outbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.outbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for DemoController {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        for &byte in buf {
            // The firmware ignores bytes it has no command for
            if let Some(cmd) = MotionCommand::from_wire_byte(byte) {
                state.apply(cmd);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CommunicationChannel for DemoController {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        Ok(self.state().outbound.len() as u32)
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.state().outbound.clear();
        Ok(())
    }

    fn name(&self) -> String {
        "demo".to_string()
    }
}
