use cncpanel_core::protocol::{
    decode, CommunicationChannel, ControllerLink, DecodedEvent, MotionCommand, PortHandle,
    ProtocolError, RawFrame,
};
use pretty_assertions::assert_eq;
use std::collections::{HashSet, VecDeque};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Mock serial port for testing
#[derive(Default)]
struct MockSerial {
    send_buffer: Vec<u8>,
    recv_chunks: VecDeque<Vec<u8>>,
    fail_on_send: bool,
    fail_on_read: bool,
}

#[derive(Clone, Default)]
struct SharedMock(Arc<Mutex<MockSerial>>);

impl SharedMock {
    fn queue(&self, chunk: &[u8]) {
        self.0.lock().unwrap().recv_chunks.push_back(chunk.to_vec());
    }

    fn sent(&self) -> Vec<u8> {
        self.0.lock().unwrap().send_buffer.clone()
    }
}

impl Read for SharedMock {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut mock = self.0.lock().unwrap();
        if mock.fail_on_read {
            return Err(io::Error::new(io::ErrorKind::Other, "Serial read failed"));
        }
        match mock.recv_chunks.pop_front() {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    let rest = chunk.split_off(n);
                    mock.recv_chunks.push_front(rest);
                }
                Ok(n)
            }
            None => Ok(0),
        }
    }
}

impl Write for SharedMock {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut mock = self.0.lock().unwrap();
        if mock.fail_on_send {
            return Err(io::Error::new(io::ErrorKind::Other, "Serial write failed"));
        }
        mock.send_buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CommunicationChannel for SharedMock {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        let mock = self.0.lock().unwrap();
        Ok(mock.recv_chunks.front().map_or(0, |c| c.len() as u32))
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().recv_chunks.clear();
        Ok(())
    }
}

fn mock_link() -> (ControllerLink, SharedMock) {
    let mock = SharedMock::default();
    let link = ControllerLink::from_port(PortHandle::from_channel(Box::new(mock.clone())));
    (link, mock)
}

#[test]
fn test_every_command_is_one_distinct_byte() {
    let (mut link, mock) = mock_link();
    for cmd in MotionCommand::ALL {
        assert!(link.send(cmd));
    }
    let sent = mock.sent();
    assert_eq!(sent, b"rs=am+-<>gP".to_vec());
    assert_eq!(sent.iter().collect::<HashSet<_>>().len(), MotionCommand::ALL.len());
}

#[test]
fn test_write_failure_does_not_propagate() {
    let (mut link, mock) = mock_link();
    mock.0.lock().unwrap().fail_on_send = true;
    assert!(!link.send(MotionCommand::Run));
    assert!(!link.send(MotionCommand::Sleep));
    assert_eq!(link.stats().write_failures, 2);
    assert!(mock.sent().is_empty());
}

#[test]
fn test_read_failure_yields_no_events() {
    let (mut link, mock) = mock_link();
    mock.queue(b"100>=");
    mock.0.lock().unwrap().fail_on_read = true;
    assert!(link.poll_and_decode().is_empty());
}

#[test]
fn test_reads_resume_after_failure_clears() {
    let (mut link, mock) = mock_link();
    mock.queue(b"100>=");
    mock.0.lock().unwrap().fail_on_read = true;
    for _ in 0..3 {
        assert!(link.poll_and_decode().is_empty());
    }
    mock.0.lock().unwrap().fail_on_read = false;
    assert_eq!(link.poll_and_decode(), vec![DecodedEvent::PositionUpdate(25)]);
}

#[test]
fn test_large_backlog_yields_only_real_positions() {
    let (mut link, mock) = mock_link();
    for _ in 0..2000 {
        mock.queue(b"12345>=");
    }
    let mut events = Vec::new();
    for _ in 0..3 {
        events.extend(link.poll_and_decode());
    }
    assert_eq!(events.len(), 2000);
    assert!(events
        .iter()
        .all(|e| *e == DecodedEvent::PositionUpdate(3086)));
    assert_eq!(link.stats().frames, 1);
}

#[test]
fn test_frame_split_across_reads_is_reassembled() {
    let (mut link, mock) = mock_link();
    mock.queue(b"1");
    mock.queue(b"00>");
    mock.queue(b"=20");
    mock.queue(b"0>=.");
    assert_eq!(
        link.poll_and_decode(),
        vec![
            DecodedEvent::CycleTick,
            DecodedEvent::PositionUpdate(25),
            DecodedEvent::PositionUpdate(50),
        ]
    );
}

#[test]
fn test_partial_token_not_carried_into_next_cycle() {
    let (mut link, mock) = mock_link();
    mock.queue(b"40>=12");
    assert_eq!(link.poll_and_decode(), vec![DecodedEvent::PositionUpdate(10)]);

    // "12" was dropped, so "34>=" decodes on its own
    mock.queue(b"34>=");
    assert_eq!(link.poll_and_decode(), vec![DecodedEvent::PositionUpdate(8)]);
}

#[test]
fn test_poll_unopened_returns_immediately() {
    let mut link = ControllerLink::from_port(PortHandle::unopened("/dev/ttyACM2"));
    let start = Instant::now();
    for _ in 0..1000 {
        assert!(link.poll().is_empty());
    }
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_decode_matches_reference_division() {
    for raw in [-1001i64, -9, -4, -3, -1, 0, 1, 3, 4, 123, 4095, 1_000_003] {
        let frame = RawFrame::from(format!("{}>=", raw).as_str());
        assert_eq!(decode(&frame), vec![DecodedEvent::PositionUpdate(raw / 4)]);
    }
}

#[test]
fn test_decode_is_pure() {
    let frames = ["3.2", "100>=200>=", "12a>=", "", ">=-9>=x"];
    let first: Vec<_> = frames.iter().map(|f| decode(&RawFrame::from(*f))).collect();
    let second: Vec<_> = frames.iter().rev().map(|f| decode(&RawFrame::from(*f))).collect();
    assert_eq!(first, second.into_iter().rev().collect::<Vec<_>>());
}

#[test]
fn test_insane_tokens_never_surface() {
    for token in ["12a", "0x10", "1.5e3", "+4", "\r\n8", "   "] {
        let frame = RawFrame::from(format!("{}>=", token).as_str());
        let positions: Vec<_> = decode(&frame)
            .into_iter()
            .filter(|e| matches!(e, DecodedEvent::PositionUpdate(_)))
            .collect();
        assert!(positions.is_empty(), "token {:?} produced {:?}", token, positions);
    }
}

#[test]
fn test_protocol_error_display() {
    assert_eq!(ProtocolError::NotOpen.to_string(), "Port is not open");
    assert_eq!(
        ProtocolError::PortNotFound.to_string(),
        "No serial port available"
    );
    let err: ProtocolError = io::Error::new(io::ErrorKind::Other, "boom").into();
    assert!(err.to_string().contains("boom"));
}
