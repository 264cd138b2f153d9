//! Frame tickets: one outstanding cook request and its input snapshot.

use std::time::Instant;

use synapse_core::{FrameTime, ParamValue, SharedTextureDescriptor};

/// Correlates one host frame tick with one cook request.
///
/// Created at tick, resolved when the matching response arrives or the
/// deadline passes, then discarded. The input snapshot is kept so a resolved
/// or abandoned ticket can be reasoned about after the fact.
#[derive(Clone, Debug)]
pub struct FrameTicket {
    /// Sequence number, strictly increasing per instance lifetime.
    pub sequence: u64,
    /// Host time the cook was requested for.
    pub time: FrameTime,
    /// True if the host timeline jumped since the last request.
    pub discontinuity: bool,
    /// When the request was issued, for deadline tracking.
    pub issued_at: Instant,
    /// Dirty input snapshot sent with the request.
    pub inputs: Vec<(String, ParamValue)>,
    /// Shared texture inputs sent with the request.
    pub textures: Vec<(String, SharedTextureDescriptor)>,
}

impl FrameTicket {
    /// Returns true if this ticket has outlived `timeout` as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: Instant, timeout: std::time::Duration) -> bool {
        now.duration_since(self.issued_at) > timeout
    }
}
