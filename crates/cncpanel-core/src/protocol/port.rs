//! Port handle
//!
//! Owns the channel to the controller, or nothing if opening failed. Every
//! operation on an unopened or closed handle returns [`ProtocolError::NotOpen`]
//! instead of panicking, so a missing board never takes the panel down.

use std::io::{ErrorKind, Read, Write};

use super::serial::{clear_buffers, configure_port, open_port};
use super::stream::{CommunicationChannel, SerialChannel};
use super::{ProtocolError, DEFAULT_READ_CHUNK_SIZE};

/// Exclusive handle on the controller channel
pub struct PortHandle {
    channel: Option<Box<dyn CommunicationChannel>>,
    name: String,
    read_chunk_size: usize,
    read_failing: bool,
}

impl PortHandle {
    /// Open and configure a serial port
    pub fn open(name: &str, baud_rate: u32) -> Result<Self, ProtocolError> {
        let mut port = open_port(name, Some(baud_rate))?;
        configure_port(port.as_mut())?;
        // Drop whatever the board sent before we were listening
        clear_buffers(port.as_mut())?;

        tracing::info!(port = name, baud_rate, "serial port opened");
        Ok(Self::from_channel(Box::new(SerialChannel::new(port))))
    }

    /// Wrap an already open channel
    pub fn from_channel(channel: Box<dyn CommunicationChannel>) -> Self {
        let name = channel.name();
        Self {
            channel: Some(channel),
            name,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            read_failing: false,
        }
    }

    /// A handle that never opened; all I/O is refused
    pub fn unopened(name: impl Into<String>) -> Self {
        Self {
            channel: None,
            name: name.into(),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            read_failing: false,
        }
    }

    /// Cap the number of bytes taken per read
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the last read attempt failed
    pub fn is_read_failing(&self) -> bool {
        self.read_failing
    }

    /// Record read health. Returns true when the state flipped.
    pub fn set_read_failing(&mut self, failing: bool) -> bool {
        let changed = self.read_failing != failing;
        self.read_failing = failing;
        changed
    }

    /// Issue a single write; returns how many bytes the channel accepted
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize, ProtocolError> {
        let channel = self.channel.as_mut().ok_or(ProtocolError::NotOpen)?;
        Ok(channel.write(bytes)?)
    }

    /// Take whatever is queued right now, up to one chunk. Empty means idle.
    pub fn read_available(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let channel = self.channel.as_mut().ok_or(ProtocolError::NotOpen)?;

        let queued = channel.bytes_to_read()? as usize;
        if queued == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; queued.min(self.read_chunk_size)];
        match channel.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Throw away queued input without decoding it
    pub fn discard_input(&mut self) -> Result<(), ProtocolError> {
        let channel = self.channel.as_mut().ok_or(ProtocolError::NotOpen)?;
        channel.clear_input_buffer()?;
        Ok(())
    }

    /// Release the channel. Returns false if it was already released.
    pub fn close(&mut self) -> bool {
        match self.channel.take() {
            Some(mut channel) => {
                if let Err(e) = channel.flush() {
                    tracing::debug!(port = %self.name, "flush on close failed: {}", e);
                }
                tracing::info!(port = %self.name, "port closed");
                true
            }
            None => false,
        }
    }
}

impl Drop for PortHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for PortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortHandle")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .field("read_chunk_size", &self.read_chunk_size)
            .finish()
    }
}
