//! # Channel Layer
//!
//! Byte transports carrying cook-wire frames.
//!
//! ## Design
//!
//! - [`Channel`] is the seam the bridge works against: one `send`, one
//!   drain-style `poll`, both non-blocking
//! - [`TcpChannel`] talks to a real external engine process
//! - [`LoopbackChannel`] wires two in-process endpoints together for tests
//!   and simulation
//! - Both feed received bytes through the same [`FrameAssembler`], so framing
//!   bugs cannot hide behind the test transport

mod loopback;
mod tcp;

pub use loopback::LoopbackChannel;
pub use tcp::TcpChannel;

use crate::error::ChannelError;
use crate::protocol::{decode_payload, FrameHeader, Message};
use crate::{MAX_FRAME_SIZE, PROTOCOL_VERSION};

/// Channel statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChannelStats {
    /// Frames sent.
    pub frames_sent: u64,
    /// Frames received and decoded.
    pub frames_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Frames skipped because their type is unknown to this build.
    pub unknown_frames: u64,
}

/// A bidirectional, non-blocking message channel to the external engine.
///
/// Loss of the channel is fatal to the owning engine instance; every method
/// reports it as [`ChannelError::Disconnected`] and the caller must tear the
/// instance down.
pub trait Channel: Send {
    /// Sends one message.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Disconnected`] on channel loss,
    /// [`ChannelError::FrameTooLarge`] if the message does not fit a frame.
    fn send(&mut self, message: &Message) -> Result<(), ChannelError>;

    /// Drains every complete frame currently available into `out`.
    ///
    /// Returns the number of messages appended. A poll is finite: it never
    /// blocks waiting for more bytes, and it may be restarted at any time.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Disconnected`] on channel loss; decode errors for
    /// known-but-corrupt frames.
    fn poll(&mut self, out: &mut Vec<Message>) -> Result<usize, ChannelError>;

    /// Returns transfer statistics.
    fn stats(&self) -> ChannelStats;
}

/// Reassembles length-prefixed frames from an arbitrary byte stream.
///
/// Shared by every channel implementation so partial-frame handling is
/// exercised even over the loopback transport.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: Vec<u8>,
}

impl FrameAssembler {
    /// Creates an empty assembler.
    #[must_use]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Appends received bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pops the next complete frame, if one is buffered.
    ///
    /// # Errors
    ///
    /// [`ChannelError::VersionMismatch`] if the peer speaks another version,
    /// [`ChannelError::FrameTooLarge`] if a length prefix exceeds the cap.
    pub fn next_frame(&mut self) -> Result<Option<(FrameHeader, Vec<u8>)>, ChannelError> {
        let Some(header) = FrameHeader::parse(&self.buf) else {
            return Ok(None);
        };

        if header.version != PROTOCOL_VERSION {
            return Err(ChannelError::VersionMismatch {
                ours: PROTOCOL_VERSION,
                theirs: header.version,
            });
        }

        let payload_len = header.payload_len as usize;
        if payload_len > MAX_FRAME_SIZE {
            return Err(ChannelError::FrameTooLarge { size: payload_len });
        }

        let total = FrameHeader::SIZE + payload_len;
        if self.buf.len() < total {
            return Ok(None);
        }

        let payload = self.buf[FrameHeader::SIZE..total].to_vec();
        self.buf.drain(..total);
        Ok(Some((header, payload)))
    }

    /// Decodes every buffered complete frame into `out`.
    ///
    /// Unknown frame types bump `unknown` and are dropped.
    ///
    /// # Errors
    ///
    /// Propagates framing and decode errors.
    pub fn drain_into(
        &mut self,
        out: &mut Vec<Message>,
        unknown: &mut u64,
    ) -> Result<usize, ChannelError> {
        let mut appended = 0;
        while let Some((header, payload)) = self.next_frame()? {
            match decode_payload(header.message_type, &payload)? {
                Some(message) => {
                    out.push(message);
                    appended += 1;
                }
                None => {
                    *unknown += 1;
                    tracing::debug!(
                        "skipping unknown frame type {} ({} bytes)",
                        header.message_type,
                        payload.len()
                    );
                }
            }
        }
        Ok(appended)
    }
}
