//! Controller link
//!
//! What the panel loop talks to: fire-and-forget command bytes out, and once
//! per frame a drain of everything the board sent, decoded into events.
//! Nothing here is fatal. A board that is missing or unplugged just means
//! sends do nothing and polls come back empty.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::decoder::{decode, DecodedEvent, RawFrame};
use super::drain::drain;
use super::port::PortHandle;
use super::{MotionCommand, ProtocolError};
use crate::config::{LinkConfig, RampSettings};

/// Commands sent when the panel starts: driver off, manual mode, clockwise
pub const INIT_SEQUENCE: [MotionCommand; 3] = [
    MotionCommand::Sleep,
    MotionCommand::ModeManual,
    MotionCommand::DirCW,
];

/// Direction of a speed ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RampDirection {
    Up,
    Down,
}

impl RampDirection {
    pub fn command(&self) -> MotionCommand {
        match self {
            RampDirection::Up => MotionCommand::SpeedPlus,
            RampDirection::Down => MotionCommand::SpeedMinus,
        }
    }
}

/// Cumulative traffic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    /// Bytes accepted by the port
    pub tx_bytes: u64,
    /// Commands that reached the port
    pub tx_commands: u64,
    /// Commands dropped (port closed or write failed)
    pub write_failures: u64,
    /// Bytes drained from the port
    pub rx_bytes: u64,
    /// Non-empty frames drained
    pub frames: u64,
    /// Events decoded
    pub events: u64,
}

/// Serial link to the motor controller
#[derive(Debug)]
pub struct ControllerLink {
    port: PortHandle,
    stats: LinkStats,
}

impl ControllerLink {
    /// Open the configured port. Failure is logged and leaves the link unopened.
    pub fn open(config: &LinkConfig) -> Self {
        match Self::try_open(config) {
            Ok(link) => link,
            Err(e) => {
                let name = config
                    .resolved_port_name()
                    .unwrap_or_else(|_| "<no port>".to_string());
                tracing::warn!(port = %name, "controller not connected: {}", e);
                Self::with_port(PortHandle::unopened(name), config)
            }
        }
    }

    /// Open the configured port, reporting failure to the caller
    pub fn try_open(config: &LinkConfig) -> Result<Self, ProtocolError> {
        let name = config.resolved_port_name()?;
        let port = PortHandle::open(&name, config.baud_rate)?;
        Ok(Self::with_port(port, config))
    }

    /// Build a link over an existing handle
    pub fn with_port(port: PortHandle, config: &LinkConfig) -> Self {
        Self {
            port: port.with_read_chunk_size(config.read_chunk_size),
            stats: LinkStats::default(),
        }
    }

    /// Link over a handle with its own read settings
    pub fn from_port(port: PortHandle) -> Self {
        Self {
            port,
            stats: LinkStats::default(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.port.is_open()
    }

    pub fn port_name(&self) -> &str {
        self.port.name()
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Write one command byte. Returns whether it reached the port.
    pub fn send(&mut self, cmd: MotionCommand) -> bool {
        match self.port.write_bytes(&cmd.encode()) {
            Ok(1) => {
                self.stats.tx_bytes += 1;
                self.stats.tx_commands += 1;
                tracing::trace!(command = %cmd, "sent");
                true
            }
            Ok(n) => {
                self.stats.write_failures += 1;
                tracing::debug!(command = %cmd, written = n, "write skipped");
                false
            }
            Err(e) => {
                self.stats.write_failures += 1;
                tracing::debug!(command = %cmd, "write skipped: {}", e);
                false
            }
        }
    }

    /// Send commands in order; returns how many reached the port
    pub fn send_all(&mut self, cmds: &[MotionCommand]) -> usize {
        cmds.iter().filter(|&&cmd| self.send(cmd)).count()
    }

    /// Put the board into a known state after startup
    pub fn initialize(&mut self) -> usize {
        let sent = self.send_all(&INIT_SEQUENCE);
        tracing::info!(port = self.port.name(), sent, "link initialized");
        sent
    }

    /// Send a burst of speed steps spaced by `ramp.interval_ms`.
    ///
    /// Blocks the caller for `(steps - 1) * interval_ms`.
    pub fn ramp(&mut self, direction: RampDirection, ramp: &RampSettings) -> u32 {
        let interval = Duration::from_millis(ramp.interval_ms);
        let mut sent = 0;
        for step in 0..ramp.steps {
            if step > 0 && !interval.is_zero() {
                std::thread::sleep(interval);
            }
            if self.send(direction.command()) {
                sent += 1;
            }
        }
        tracing::debug!(?direction, steps = ramp.steps, sent, "ramp done");
        sent
    }

    /// Drain everything queued on the port into one frame
    pub fn poll(&mut self) -> RawFrame {
        let frame = drain(&mut self.port);
        if !frame.is_empty() {
            self.stats.rx_bytes += frame.len() as u64;
            self.stats.frames += 1;
        }
        frame
    }

    /// Drain and decode in one step
    pub fn poll_and_decode(&mut self) -> Vec<DecodedEvent> {
        let frame = self.poll();
        let events = decode(&frame);
        self.stats.events += events.len() as u64;
        events
    }

    /// Throw away whatever the board has queued
    pub fn discard_input(&mut self) {
        if let Err(e) = self.port.discard_input() {
            tracing::debug!(port = self.port.name(), "discard skipped: {}", e);
        }
    }

    /// Close the port; later sends and polls do nothing
    pub fn close(&mut self) -> bool {
        self.port.close()
    }
}
