//! # Bridge Error Types
//!
//! The error taxonomy of the frame exchange core.
//!
//! ## Containment
//!
//! - Scheduler-level errors (timeouts, stale responses) are contained and
//!   reported as per-frame [`crate::TickOutcome`]s
//! - Lifecycle-level errors (channel loss, device loss, retry exhaustion)
//!   escalate the instance to `Faulted` and require an explicit reload

use synapse_core::ParamKind;
use synapse_gpu::ResourceBridgeError;
use synapse_transport::ChannelError;
use thiserror::Error;

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that can occur in the frame exchange bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Transport failure. Fatal to the instance.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// GPU interop failure. Fatal to the current frame's textures; device
    /// loss escalates to a fault.
    #[error("resource bridge error: {0}")]
    Resource(#[from] ResourceBridgeError),

    /// The external engine missed the cook deadline. Recoverable; the frame
    /// is dropped and the scheduler returns to idle.
    #[error("cook {sequence} timed out")]
    FrameTimeout {
        /// Sequence number of the abandoned ticket.
        sequence: u64,
    },

    /// A value of the wrong kind was written to a parameter. Caller error.
    #[error("parameter '{name}' expects {expected}, got {got}")]
    ParameterTypeMismatch {
        /// Parameter name.
        name: String,
        /// Declared kind.
        expected: ParamKind,
        /// Kind of the rejected value.
        got: ParamKind,
    },

    /// No parameter with this name is declared in the current layout.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    /// The parameter is an engine output; the host may not write it.
    #[error("parameter '{0}' is not an input")]
    NotAnInput(String),

    /// The parameter is a host input; a cook response may not write it.
    #[error("parameter '{0}' is not an output")]
    NotAnOutput(String),

    /// The operation needs a `Ready` instance.
    #[error("instance not ready (state: {state})")]
    NotReady {
        /// State the instance was actually in.
        state: String,
    },

    /// The instance is faulted; only an explicit reload may leave this state.
    #[error("instance faulted: {0}")]
    Faulted(String),

    /// Every reconnect attempt failed.
    #[error("gave up after {attempts} connect attempts")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    /// The handshake or content load did not complete.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// A configuration file could not be read or parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
