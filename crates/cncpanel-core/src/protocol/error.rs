//! Protocol errors

use thiserror::Error;

/// Errors that can occur on the controller link
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Failed to open '{port}': {reason}")]
    OpenFailed { port: String, reason: String },

    #[error("Port is not open")]
    NotOpen,

    #[error("No serial port available")]
    PortNotFound,

    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// True for errors that mean "no data right now" rather than a failure
    pub fn is_idle(&self) -> bool {
        match self {
            ProtocolError::IoError(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

impl From<serialport::Error> for ProtocolError {
    fn from(e: serialport::Error) -> Self {
        ProtocolError::SerialError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_timeout_is_idle() {
        let err = ProtocolError::from(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert!(err.is_idle());
    }

    #[test]
    fn test_broken_pipe_is_not_idle() {
        let err = ProtocolError::from(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(!err.is_idle());
        assert!(!ProtocolError::NotOpen.is_idle());
    }

    #[test]
    fn test_open_failed_display() {
        let err = ProtocolError::OpenFailed {
            port: "/dev/ttyACM2".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to open '/dev/ttyACM2': permission denied"
        );
    }
}
