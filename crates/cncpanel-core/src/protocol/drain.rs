//! Drain loop
//!
//! Pulls everything currently queued on the port into one frame. Reads are
//! non-blocking, so the first empty read ends the loop on the same cycle.

use super::decoder::RawFrame;
use super::port::PortHandle;

/// Read until the port reports nothing queued or an error.
///
/// A failing port logs a warning once; repeats stay at debug until a read
/// succeeds again.
pub fn drain(port: &mut PortHandle) -> RawFrame {
    let mut frame = RawFrame::new();
    if !port.is_open() {
        return frame;
    }

    let mut reads = 0usize;
    loop {
        match port.read_available() {
            Ok(bytes) => {
                if port.set_read_failing(false) {
                    tracing::info!(port = port.name(), "reads recovered");
                }
                if bytes.is_empty() {
                    break;
                }
                reads += 1;
                frame.extend(&bytes);
            }
            Err(e) if e.is_idle() => break,
            Err(e) => {
                if port.set_read_failing(true) {
                    tracing::warn!(port = port.name(), "read failed: {}", e);
                } else {
                    tracing::debug!(port = port.name(), "read still failing: {}", e);
                }
                break;
            }
        }
    }

    if !frame.is_empty() {
        tracing::trace!(reads, bytes = frame.len(), frame = %frame, "drained");
    }
    frame
}
