//! Controller serial protocol
//!
//! Outbound: one ASCII byte per [`MotionCommand`], no framing, no reply.
//!
//! Inbound: free-running ASCII status. A `.` marks a finished cycle and
//! `<microsteps>>=` reports the stepper position.

pub mod commands;
pub mod decoder;
mod drain;
mod error;
mod link;
mod port;
pub mod serial;
pub mod stream;

pub use commands::MotionCommand;
pub use decoder::{decode, DecodedEvent, RawFrame};
pub use drain::drain;
pub use error::ProtocolError;
pub use link::{ControllerLink, LinkStats, RampDirection, INIT_SEQUENCE};
pub use port::PortHandle;
pub use serial::{list_ports, PortInfo};
pub use stream::CommunicationChannel;

/// Default baud rate for the controller board
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Serial read/write timeout in milliseconds
pub const PORT_TIMEOUT_MS: u64 = 10;

/// Largest single read from the port
pub const DEFAULT_READ_CHUNK_SIZE: usize = 512;

/// Microsteps per displayed position unit
pub const MICROSTEP_FACTOR: i64 = 4;

/// Terminates each position report
pub const POSITION_DELIMITER: &[u8] = b">=";

/// Marks a completed cycle
pub const CYCLE_MARKER: u8 = b'.';
