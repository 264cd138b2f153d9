//! Non-blocking TCP channel to an external engine process.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use super::{Channel, ChannelStats, FrameAssembler};
use crate::error::ChannelError;
use crate::protocol::{FrameWriter, Message};

/// Size of the per-poll socket read buffer.
const READ_CHUNK: usize = 8192;

/// TCP channel wrapper tuned for the cook wire.
///
/// This is a thin wrapper around a non-blocking `std` stream with:
/// - Nagle disabled (cook requests are latency sensitive)
/// - An outgoing byte queue, flushed on every send and poll
/// - Partial-frame reassembly on the receive side
pub struct TcpChannel {
    /// The underlying stream.
    stream: TcpStream,
    /// Frame encoder, reused across sends.
    writer: FrameWriter,
    /// Bytes accepted by `send` but not yet accepted by the socket.
    pending_out: Vec<u8>,
    /// Receive-side frame reassembly.
    assembler: FrameAssembler,
    /// Scratch buffer for socket reads.
    read_buf: [u8; READ_CHUNK],
    /// Statistics.
    stats: ChannelStats,
}

impl TcpChannel {
    /// Connects to an external engine at `addr`.
    ///
    /// The connect itself blocks up to `timeout`; the channel is
    /// non-blocking afterwards.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Io`] if the connect or socket configuration fails.
    pub fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self, ChannelError> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        Self::from_stream(stream)
    }

    /// Wraps an already-established stream (the accept side).
    ///
    /// # Errors
    ///
    /// [`ChannelError::Io`] if socket configuration fails.
    pub fn from_stream(stream: TcpStream) -> Result<Self, ChannelError> {
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            writer: FrameWriter::new(),
            pending_out: Vec::new(),
            assembler: FrameAssembler::new(),
            read_buf: [0u8; READ_CHUNK],
            stats: ChannelStats::default(),
        })
    }

    /// Returns the peer address, if the socket still has one.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }

    /// Pushes queued outgoing bytes into the socket until it would block.
    fn flush(&mut self) -> Result<(), ChannelError> {
        while !self.pending_out.is_empty() {
            match self.stream.write(&self.pending_out) {
                Ok(0) => return Err(ChannelError::Disconnected),
                Ok(n) => {
                    self.pending_out.drain(..n);
                    self.stats.bytes_sent += n as u64;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(_) => return Err(ChannelError::Disconnected),
            }
        }
        Ok(())
    }

    /// Reads available bytes into the assembler until the socket would block.
    fn fill(&mut self) -> Result<(), ChannelError> {
        loop {
            match self.stream.read(&mut self.read_buf) {
                Ok(0) => return Err(ChannelError::Disconnected),
                Ok(n) => {
                    self.assembler.push(&self.read_buf[..n]);
                    self.stats.bytes_received += n as u64;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(_) => return Err(ChannelError::Disconnected),
            }
        }
    }
}

impl Channel for TcpChannel {
    fn send(&mut self, message: &Message) -> Result<(), ChannelError> {
        let frame = self.writer.encode(message)?;
        self.pending_out.extend_from_slice(frame);
        self.stats.frames_sent += 1;
        self.flush()
    }

    fn poll(&mut self, out: &mut Vec<Message>) -> Result<usize, ChannelError> {
        self.flush()?;
        self.fill()?;
        let appended = self
            .assembler
            .drain_into(out, &mut self.stats.unknown_frames)?;
        self.stats.frames_received += appended as u64;
        Ok(appended)
    }

    fn stats(&self) -> ChannelStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    /// Polls `channel` until `count` messages arrive or the deadline passes.
    fn poll_until(channel: &mut TcpChannel, count: usize) -> Vec<Message> {
        let mut out = Vec::new();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while out.len() < count {
            assert!(std::time::Instant::now() < deadline, "poll deadline");
            channel.poll(&mut out).unwrap();
            std::thread::sleep(Duration::from_millis(1));
        }
        out
    }

    #[test]
    fn test_tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut host = TcpChannel::connect(addr, Duration::from_secs(1)).unwrap();
        let (engine_stream, _) = listener.accept().unwrap();
        let mut engine = TcpChannel::from_stream(engine_stream).unwrap();

        host.send(&Message::LoadContent {
            descriptor: "scenes/stage.bundle".into(),
        })
        .unwrap();
        host.send(&Message::CancelFrame { sequence: 1 }).unwrap();

        let received = poll_until(&mut engine, 2);
        assert_eq!(
            received[0],
            Message::LoadContent {
                descriptor: "scenes/stage.bundle".into()
            }
        );
        assert_eq!(received[1], Message::CancelFrame { sequence: 1 });

        engine.send(&Message::Teardown).unwrap();
        let received = poll_until(&mut host, 1);
        assert_eq!(received[0], Message::Teardown);

        assert_eq!(host.stats().frames_sent, 2);
        assert_eq!(host.stats().frames_received, 1);
    }

    #[test]
    fn test_tcp_disconnect_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut host = TcpChannel::connect(addr, Duration::from_secs(1)).unwrap();
        let (engine_stream, _) = listener.accept().unwrap();
        drop(engine_stream);

        let mut out = Vec::new();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            assert!(std::time::Instant::now() < deadline, "disconnect deadline");
            match host.poll(&mut out) {
                Err(ChannelError::Disconnected) => break,
                Err(other) => panic!("unexpected error: {other}"),
                Ok(_) => std::thread::sleep(Duration::from_millis(1)),
            }
        }
    }
}
