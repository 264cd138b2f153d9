//! # Host-Visible Events
//!
//! Everything the bridge wants the surrounding application to know, drained
//! via [`crate::EngineInstance::drain_events`] at the host's convenience.

use synapse_core::{ParamLayout, Severity};

/// An event surfaced to the host application.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// Content finished loading; the instance is ready to cook.
    Loaded {
        /// Parameter layout of the loaded content.
        layout: ParamLayout,
    },
    /// The external engine changed its parameter layout at runtime.
    LayoutChanged {
        /// The replacement layout.
        layout: ParamLayout,
    },
    /// A cook resolved and its outputs were applied atomically.
    FrameFinished {
        /// Sequence number of the finished cook.
        sequence: u64,
    },
    /// A cook missed its deadline and was abandoned. Surfaced exactly once
    /// per ticket.
    FrameTimedOut {
        /// Sequence number of the abandoned cook.
        sequence: u64,
    },
    /// Diagnostic message from the external engine.
    Message {
        /// Message severity.
        severity: Severity,
        /// Message text.
        text: String,
    },
    /// The instance faulted; only an explicit reload recovers it.
    Faulted {
        /// Why the instance faulted.
        reason: String,
    },
    /// The instance finished unloading.
    Unloaded,
}
