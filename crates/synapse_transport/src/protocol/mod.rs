//! # Frame Definitions
//!
//! All message types that cross the cook wire.
//!
//! ## Wire Layout
//!
//! Every frame is an 8-byte Pod header followed by a little-endian payload:
//!
//! ```text
//! ┌────────────┬─────────┬──────┬─────────┬──────────────────────┐
//! │ payload_len│ version │ type │ padding │ payload ...          │
//! │ u32        │ u8      │ u8   │ [u8; 2] │ (payload_len bytes)  │
//! └────────────┴─────────┴──────┴─────────┴──────────────────────┘
//! ```
//!
//! The header is fixed forever; new capabilities are added as new frame
//! types, which old readers skip using the length prefix.

mod codec;

pub use codec::{decode_payload, FrameReader, FrameWriter};

use bytemuck::{Pod, Zeroable};
use synapse_core::{
    CapabilitySet, FrameTime, ParamLayout, ParamValue, Severity, SharedTextureDescriptor,
};

/// Frame header - present in every frame.
///
/// Total size: 8 bytes
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
pub struct FrameHeader {
    /// Payload length in bytes, excluding this header.
    pub payload_len: u32,
    /// Protocol version of the sender.
    pub version: u8,
    /// Frame type discriminant.
    pub message_type: u8,
    /// Padding for alignment.
    pub _padding: [u8; 2],
}

impl FrameHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 8;

    /// Creates a new frame header.
    #[inline]
    #[must_use]
    pub const fn new(payload_len: u32, version: u8, message_type: u8) -> Self {
        Self {
            payload_len,
            version,
            message_type,
            _padding: [0; 2],
        }
    }

    /// Parses a header from the first [`Self::SIZE`] bytes of a buffer.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        bytemuck::try_pod_read_unaligned(&bytes[..Self::SIZE]).ok()
    }
}

/// Types of frames on the cook wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Host -> Engine: handshake with host capabilities.
    Hello = 0,
    /// Engine -> Host: handshake answer with engine capabilities.
    HelloAck = 1,
    /// Host -> Engine: load a content bundle.
    LoadContent = 2,
    /// Engine -> Host: content is loaded, here is its parameter layout.
    ContentLoaded = 3,
    /// Host -> Engine: input parameter updates outside a cook request.
    ParamSet = 4,
    /// Host -> Engine: cook one frame with this input snapshot.
    CookRequest = 5,
    /// Engine -> Host: cook finished, outputs and textures attached.
    CookResponse = 6,
    /// Host -> Engine: abandon the named in-flight cook.
    CancelFrame = 7,
    /// Engine -> Host: diagnostic message stream.
    EngineMessage = 8,
    /// Engine -> Host: the parameter layout changed at runtime.
    LayoutChanged = 9,
    /// Bidirectional: orderly shutdown of the instance.
    Teardown = 10,
    /// Bidirectional: the peer violated the protocol.
    ProtocolError = 11,
}

impl MessageType {
    /// Decodes a frame type from its wire discriminant.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Hello),
            1 => Some(Self::HelloAck),
            2 => Some(Self::LoadContent),
            3 => Some(Self::ContentLoaded),
            4 => Some(Self::ParamSet),
            5 => Some(Self::CookRequest),
            6 => Some(Self::CookResponse),
            7 => Some(Self::CancelFrame),
            8 => Some(Self::EngineMessage),
            9 => Some(Self::LayoutChanged),
            10 => Some(Self::Teardown),
            11 => Some(Self::ProtocolError),
            _ => None,
        }
    }
}

/// A decoded frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// Handshake from the host side.
    Hello {
        /// Capabilities of the host.
        capabilities: CapabilitySet,
    },
    /// Handshake answer from the engine side.
    HelloAck {
        /// Capabilities of the external engine.
        capabilities: CapabilitySet,
    },
    /// Request to load a content bundle.
    LoadContent {
        /// Path or identifier of the content bundle.
        descriptor: String,
    },
    /// Content finished loading.
    ContentLoaded {
        /// Parameter layout of the loaded content.
        layout: ParamLayout,
    },
    /// Input parameter updates outside a cook request.
    ParamSet {
        /// Updated name/value pairs.
        updates: Vec<(String, ParamValue)>,
    },
    /// Cook one frame.
    CookRequest {
        /// Ticket sequence number, strictly increasing per instance.
        sequence: u64,
        /// Host time for this frame.
        time: FrameTime,
        /// True if the host timeline jumped (seek, loop, reset).
        discontinuity: bool,
        /// Snapshot of dirty input parameters at issue time.
        inputs: Vec<(String, ParamValue)>,
        /// Shared texture inputs by parameter name.
        textures: Vec<(String, SharedTextureDescriptor)>,
    },
    /// Cook finished.
    CookResponse {
        /// Sequence number of the request this answers.
        sequence: u64,
        /// Output parameter values.
        outputs: Vec<(String, ParamValue)>,
        /// Shared texture outputs by parameter name.
        textures: Vec<(String, SharedTextureDescriptor)>,
    },
    /// Abandon an in-flight cook.
    CancelFrame {
        /// Sequence number of the cook to abandon.
        sequence: u64,
    },
    /// Diagnostic message from the external engine.
    EngineMessage {
        /// Message severity.
        severity: Severity,
        /// Message text.
        text: String,
    },
    /// The parameter layout changed at runtime.
    LayoutChanged {
        /// The replacement layout.
        layout: ParamLayout,
    },
    /// Orderly shutdown.
    Teardown,
    /// Protocol violation report.
    ProtocolError {
        /// Machine-readable error code.
        code: u32,
        /// Human-readable detail.
        detail: String,
    },
}

impl Message {
    /// Returns the frame type of this message.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::Hello { .. } => MessageType::Hello,
            Self::HelloAck { .. } => MessageType::HelloAck,
            Self::LoadContent { .. } => MessageType::LoadContent,
            Self::ContentLoaded { .. } => MessageType::ContentLoaded,
            Self::ParamSet { .. } => MessageType::ParamSet,
            Self::CookRequest { .. } => MessageType::CookRequest,
            Self::CookResponse { .. } => MessageType::CookResponse,
            Self::CancelFrame { .. } => MessageType::CancelFrame,
            Self::EngineMessage { .. } => MessageType::EngineMessage,
            Self::LayoutChanged { .. } => MessageType::LayoutChanged,
            Self::Teardown => MessageType::Teardown,
            Self::ProtocolError { .. } => MessageType::ProtocolError,
        }
    }
}
