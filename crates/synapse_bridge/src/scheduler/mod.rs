//! # Frame Scheduler
//!
//! Coordinates the request/response cadence between the host frame tick and
//! the external engine's cook cycle.
//!
//! ## State machine
//!
//! ```text
//! Idle ──issue──▶ RequestSent ──response──▶ Idle (resolved cook pending)
//!   ▲                  │
//!   └────timeout───────┘        (ticket discarded, surfaced exactly once)
//! ```
//!
//! ## Rules
//!
//! - At most one in-flight ticket per engine instance, in every cook mode
//! - Sequence numbers are strictly increasing and never reused within an
//!   instance's lifetime, including across reloads
//! - A response whose sequence does not match the outstanding ticket is
//!   stale and is discarded without touching any state

mod ticket;

pub use ticket::FrameTicket;

use std::time::{Duration, Instant};

use synapse_core::{FrameTime, ParamValue, SharedTextureDescriptor};

use crate::config::CookMode;

/// Scheduler state for one engine instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    /// No outstanding request.
    Idle = 0,
    /// One cook request is in flight.
    RequestSent = 1,
}

/// What the scheduler wants the instance to do with the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssuePlan {
    /// Idle: snapshot dirty parameters and issue the next request.
    Issue,
    /// In flight under `Synchronized`: the host should stall and re-tick.
    Busy,
    /// In flight under a non-stalling mode: drop this tick's cook.
    Drop,
}

/// A cook response accepted for the outstanding ticket, awaiting atomic
/// application at the next tick boundary.
#[derive(Clone, Debug)]
pub struct ResolvedCook {
    /// Sequence number of the resolved ticket.
    pub sequence: u64,
    /// Output parameter values.
    pub outputs: Vec<(String, ParamValue)>,
    /// Output texture descriptors by parameter name.
    pub textures: Vec<(String, SharedTextureDescriptor)>,
}

/// Frame cadence statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    /// Cook requests issued.
    pub requested: u64,
    /// Cook responses resolved and handed to the host for application.
    pub applied: u64,
    /// Host ticks dropped because a request was in flight.
    pub dropped_ticks: u64,
    /// Tickets abandoned on deadline.
    pub timeouts: u64,
    /// Responses discarded as stale.
    pub stale_responses: u64,
    /// Tickets cancelled by teardown or device loss.
    pub cancelled: u64,
}

/// Per-instance cook cadence state machine.
pub struct FrameScheduler {
    state: SchedulerState,
    cook_mode: CookMode,
    timeout: Duration,
    next_sequence: u64,
    in_flight: Option<FrameTicket>,
    resolved: Option<ResolvedCook>,
    stats: FrameStats,
}

impl FrameScheduler {
    /// Creates a scheduler in `Idle` with sequence numbering starting at 1.
    #[must_use]
    pub fn new(cook_mode: CookMode, timeout: Duration) -> Self {
        Self {
            state: SchedulerState::Idle,
            cook_mode,
            timeout,
            next_sequence: 1,
            in_flight: None,
            resolved: None,
            stats: FrameStats::default(),
        }
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// Statistics so far.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Sequence number of the outstanding ticket, if any.
    #[must_use]
    pub fn in_flight_sequence(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|t| t.sequence)
    }

    /// Decides what this tick should do, given the current state and mode.
    #[must_use]
    pub fn plan_tick(&self) -> IssuePlan {
        match (self.state, self.cook_mode) {
            (SchedulerState::Idle, _) => IssuePlan::Issue,
            (SchedulerState::RequestSent, CookMode::Synchronized) => IssuePlan::Busy,
            (SchedulerState::RequestSent, _) => IssuePlan::Drop,
        }
    }

    /// Issues the next ticket. Must only be called when `Idle`.
    ///
    /// Assigns the next sequence number and transitions to `RequestSent`.
    pub fn issue(
        &mut self,
        now: Instant,
        time: FrameTime,
        discontinuity: bool,
        inputs: Vec<(String, ParamValue)>,
        textures: Vec<(String, SharedTextureDescriptor)>,
    ) -> &FrameTicket {
        debug_assert_eq!(self.state, SchedulerState::Idle);

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.in_flight = Some(FrameTicket {
            sequence,
            time,
            discontinuity,
            issued_at: now,
            inputs,
            textures,
        });
        self.state = SchedulerState::RequestSent;
        self.stats.requested += 1;

        self.in_flight.as_ref().unwrap_or_else(|| unreachable!())
    }

    /// Records that this tick's cook was dropped (non-stalling back-pressure).
    pub fn record_dropped_tick(&mut self) {
        self.stats.dropped_ticks += 1;
    }

    /// Offers a cook response to the outstanding ticket.
    ///
    /// Returns true if it matched and was accepted; a stale or unexpected
    /// sequence is discarded and counted, mutating nothing else.
    pub fn handle_response(
        &mut self,
        sequence: u64,
        outputs: Vec<(String, ParamValue)>,
        textures: Vec<(String, SharedTextureDescriptor)>,
    ) -> bool {
        let matches = self
            .in_flight
            .as_ref()
            .is_some_and(|ticket| ticket.sequence == sequence);
        if !matches {
            self.stats.stale_responses += 1;
            tracing::debug!(
                "discarding stale cook response {} (outstanding: {:?})",
                sequence,
                self.in_flight_sequence()
            );
            return false;
        }

        self.in_flight = None;
        self.state = SchedulerState::Idle;
        self.resolved = Some(ResolvedCook {
            sequence,
            outputs,
            textures,
        });
        true
    }

    /// Takes the resolved cook awaiting application, if any.
    pub fn take_resolved(&mut self) -> Option<ResolvedCook> {
        let resolved = self.resolved.take();
        if resolved.is_some() {
            self.stats.applied += 1;
        }
        resolved
    }

    /// Abandons the outstanding ticket if its deadline has passed.
    ///
    /// Returns the abandoned sequence number at most once per ticket; no
    /// partial output is ever applied for it.
    pub fn poll_timeout(&mut self, now: Instant) -> Option<u64> {
        let expired = self
            .in_flight
            .as_ref()
            .is_some_and(|ticket| ticket.is_expired(now, self.timeout));
        if !expired {
            return None;
        }

        let ticket = self.in_flight.take()?;
        self.state = SchedulerState::Idle;
        self.stats.timeouts += 1;
        tracing::warn!("cook {} missed its deadline, dropping frame", ticket.sequence);
        Some(ticket.sequence)
    }

    /// Cancels the outstanding ticket, if any, without applying anything.
    ///
    /// Used by teardown and device loss; the pending resolved cook (if one
    /// arrived but was not yet applied) is discarded as well.
    pub fn cancel_in_flight(&mut self) -> Option<u64> {
        self.resolved = None;
        let ticket = self.in_flight.take()?;
        self.state = SchedulerState::Idle;
        self.stats.cancelled += 1;
        Some(ticket.sequence)
    }
}
