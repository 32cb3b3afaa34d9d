//! Status decoding
//!
//! The controller reports asynchronously in plain ASCII:
//!
//! - any `.` in a frame marks a completed cycle
//! - `<raw>>=` reports the stepper position in microsteps
//!
//! Decoding is a pure function of one drained frame. Anything that does not
//! match is dropped, never reported as an error.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{CYCLE_MARKER, MICROSTEP_FACTOR, POSITION_DELIMITER};

/// Bytes drained from the port in one polling cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame(Vec<u8>);

impl RawFrame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes from a read
    pub fn extend(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for RawFrame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for RawFrame {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for RawFrame {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0).escape_default())
    }
}

/// Event decoded from a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodedEvent {
    /// The controller finished one cycle
    CycleTick,
    /// Stepper position in display units (raw microsteps / 4)
    PositionUpdate(i64),
}

/// Classification of one delimited token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Empty,
    Sane,
    Insane,
}

/// Classify a token: only digits and `-` are sane
pub fn classify_token(token: &[u8]) -> TokenKind {
    if token.is_empty() {
        TokenKind::Empty
    } else if token.iter().all(|&b| b.is_ascii_digit() || b == b'-') {
        TokenKind::Sane
    } else {
        TokenKind::Insane
    }
}

/// Parse a sane token into raw controller units.
///
/// Accepts an optional leading `-` followed by the longest run of digits;
/// anything after that run is ignored (`"12-3"` reads as 12). Returns `None`
/// when no digit follows the sign or the value does not fit in an `i64`.
pub fn parse_raw_position(token: &[u8]) -> Option<i64> {
    let (negative, rest) = match token.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, token),
    };
    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }

    let mut value: i64 = 0;
    for &b in &rest[..digits] {
        let digit = i64::from(b - b'0');
        value = value.checked_mul(10)?;
        value = if negative {
            value.checked_sub(digit)?
        } else {
            value.checked_add(digit)?
        };
    }
    Some(value)
}

/// Convert raw microsteps to display units.
///
/// Integer division truncating toward zero: `-9` becomes `-2`, not `-3`.
pub fn to_display_units(raw: i64) -> i64 {
    raw / MICROSTEP_FACTOR
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(POSITION_DELIMITER.len())
        .position(|w| w == POSITION_DELIMITER)
}

/// Decode one drained frame into events.
///
/// A cycle tick, if any, comes first; position updates follow in the order
/// they appear. Content after the last delimiter is discarded.
pub fn decode(frame: &RawFrame) -> Vec<DecodedEvent> {
    decode_bytes(frame.as_bytes())
}

/// Byte-slice form of [`decode`]
pub fn decode_bytes(frame: &[u8]) -> Vec<DecodedEvent> {
    let mut events = Vec::new();
    if frame.is_empty() {
        return events;
    }

    if frame.contains(&CYCLE_MARKER) {
        events.push(DecodedEvent::CycleTick);
    }

    let mut rest = frame;
    while let Some(at) = find_delimiter(rest) {
        let token = &rest[..at];
        rest = &rest[at + POSITION_DELIMITER.len()..];

        match classify_token(token) {
            TokenKind::Empty => {}
            TokenKind::Sane => match parse_raw_position(token) {
                Some(raw) => events.push(DecodedEvent::PositionUpdate(to_display_units(raw))),
                None => tracing::trace!(
                    token = %String::from_utf8_lossy(token),
                    "dropping unparsable position token"
                ),
            },
            TokenKind::Insane => tracing::trace!(
                token = %String::from_utf8_lossy(token).escape_default(),
                "dropping malformed token"
            ),
        }
    }

    if !rest.is_empty() {
        tracing::trace!(trailing = rest.len(), "discarding bytes after last delimiter");
    }

    events
}
