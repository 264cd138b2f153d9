//! # SYNAPSE Transport - The Cook Wire
//!
//! Bidirectional message channel between the host bridge and the external
//! compositing engine process.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        COOK WIRE                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌──────────────┐   ┌───────────────────┐   │
//! │  │ Message    │──▶│ FrameWriter  │──▶│ Channel (TCP or   │   │
//! │  │ (typed)    │   │ (LE codec)   │   │ loopback)         │   │
//! │  └────────────┘   └──────────────┘   └───────────────────┘   │
//! │                                              │               │
//! │  ┌────────────┐   ┌──────────────┐           │               │
//! │  │ Message    │◀──│ FrameReader  │◀──────────┘               │
//! │  └────────────┘   └──────────────┘                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Every frame is length-prefixed; a reader never over-reads
//! - Unknown frame types are skipped and counted, never fatal
//! - Channel loss is reported exactly once as [`ChannelError::Disconnected`]
//!   and is fatal to the owning engine instance

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod channel;
pub mod error;
pub mod protocol;

pub use channel::{Channel, ChannelStats, LoopbackChannel, TcpChannel};
pub use error::ChannelError;
pub use protocol::{decode_payload, FrameHeader, FrameReader, FrameWriter, Message, MessageType};

/// Wire protocol version. Peers must agree exactly.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum payload size of a single frame.
///
/// Large enough for a dense float stream; small enough that a corrupt
/// length prefix cannot ask the reassembly buffer for gigabytes.
pub const MAX_FRAME_SIZE: usize = 1 << 20;
