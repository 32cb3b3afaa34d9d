//! Byte channel abstraction
//!
//! The link only needs a duplex byte stream that can say how much input is
//! waiting. Serial ports, the demo controller and test doubles all plug in here.

use serialport::SerialPort;
use std::io::{self, Read, Write};

/// Duplex byte channel to a controller
pub trait CommunicationChannel: Read + Write + Send {
    /// Number of bytes queued for reading right now
    fn bytes_to_read(&mut self) -> io::Result<u32>;

    /// Discard anything queued for reading
    fn clear_input_buffer(&mut self) -> io::Result<()>;

    /// Name used in log messages
    fn name(&self) -> String {
        "channel".to_string()
    }
}

/// Serial port wrapper implementing CommunicationChannel
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl CommunicationChannel for SerialChannel {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.port.bytes_to_read().map_err(io::Error::other)
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::other)
    }

    fn name(&self) -> String {
        self.port.name().unwrap_or_else(|| "serial".to_string())
    }
}
