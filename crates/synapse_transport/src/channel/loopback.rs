//! In-process channel pair for tests and simulation.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use super::{Channel, ChannelStats, FrameAssembler};
use crate::error::ChannelError;
use crate::protocol::{FrameWriter, Message};

/// One endpoint of an in-process channel pair.
///
/// Frames are fully encoded and re-decoded on the way through, so the codec
/// path is exercised exactly as it is over TCP. The queues are the
/// process-local stand-in for the socket.
pub struct LoopbackChannel {
    /// Encoded frames to the peer.
    tx: Sender<Vec<u8>>,
    /// Encoded frames from the peer.
    rx: Receiver<Vec<u8>>,
    /// Frame encoder, reused across sends.
    writer: FrameWriter,
    /// Receive-side frame reassembly.
    assembler: FrameAssembler,
    /// Statistics.
    stats: ChannelStats,
}

impl LoopbackChannel {
    /// Creates a connected pair of endpoints.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = unbounded();
        let (b_tx, a_rx) = unbounded();
        (Self::endpoint(a_tx, a_rx), Self::endpoint(b_tx, b_rx))
    }

    fn endpoint(tx: Sender<Vec<u8>>, rx: Receiver<Vec<u8>>) -> Self {
        Self {
            tx,
            rx,
            writer: FrameWriter::new(),
            assembler: FrameAssembler::new(),
            stats: ChannelStats::default(),
        }
    }
}

impl Channel for LoopbackChannel {
    fn send(&mut self, message: &Message) -> Result<(), ChannelError> {
        let frame = self.writer.encode(message)?.to_vec();
        self.stats.bytes_sent += frame.len() as u64;
        self.tx
            .send(frame)
            .map_err(|_| ChannelError::Disconnected)?;
        self.stats.frames_sent += 1;
        Ok(())
    }

    fn poll(&mut self, out: &mut Vec<Message>) -> Result<usize, ChannelError> {
        loop {
            match self.rx.try_recv() {
                Ok(frame) => {
                    self.stats.bytes_received += frame.len() as u64;
                    self.assembler.push(&frame);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(ChannelError::Disconnected),
            }
        }
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
    use synapse_core::ParamValue;

    #[test]
    fn test_loopback_round_trip() {
        let (mut host, mut engine) = LoopbackChannel::pair();

        host.send(&Message::ParamSet {
            updates: vec![("opacity".into(), ParamValue::Double(0.5))],
        })
        .unwrap();

        let mut out = Vec::new();
        let appended = engine.poll(&mut out).unwrap();
        assert_eq!(appended, 1);
        assert_eq!(
            out[0],
            Message::ParamSet {
                updates: vec![("opacity".into(), ParamValue::Double(0.5))],
            }
        );
    }

    #[test]
    fn test_loopback_poll_is_finite() {
        let (mut host, mut engine) = LoopbackChannel::pair();
        for sequence in 0..10 {
            host.send(&Message::CancelFrame { sequence }).unwrap();
        }

        let mut out = Vec::new();
        assert_eq!(engine.poll(&mut out).unwrap(), 10);
        assert_eq!(engine.poll(&mut out).unwrap(), 0);
        assert_eq!(out.len(), 10);
    }

    #[test]
    fn test_loopback_reports_peer_loss() {
        let (mut host, engine) = LoopbackChannel::pair();
        drop(engine);

        assert!(matches!(
            host.send(&Message::Teardown),
            Err(ChannelError::Disconnected)
        ));

        let mut out = Vec::new();
        assert!(matches!(
            host.poll(&mut out),
            Err(ChannelError::Disconnected)
        ));
    }
}
