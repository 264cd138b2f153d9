//! # Transport Error Types
//!
//! All errors that can occur on the cook wire.

use thiserror::Error;

/// Errors that can occur on a transport channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The peer closed or the connection dropped.
    ///
    /// Fatal to the owning engine instance: the caller must tear the
    /// instance down and, optionally, schedule a reload.
    #[error("transport channel lost")]
    Disconnected,

    /// A frame announced a payload larger than [`crate::MAX_FRAME_SIZE`].
    #[error("frame too large: {size} bytes")]
    FrameTooLarge {
        /// Announced payload size.
        size: usize,
    },

    /// A frame's payload could not be decoded.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The peer speaks a different protocol version.
    #[error("protocol version mismatch: ours {ours}, theirs {theirs}")]
    VersionMismatch {
        /// Our protocol version.
        ours: u8,
        /// The peer's protocol version.
        theirs: u8,
    },

    /// Underlying socket error while connecting or configuring.
    #[error("transport io error: {0}")]
    Io(#[from] std::io::Error),
}
