//! # SYNAPSE Bridge - The Frame Exchange Core
//!
//! Synchronizes GPU frame submission between two independently clocked
//! rendering engines without stalling either renderer's frame loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ENGINE INSTANCE                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐       │
//! │  │ Parameter    │  │ Frame        │  │ Lifecycle    │       │
//! │  │ Registry     │  │ Scheduler    │  │ Manager      │       │
//! │  │ (dirty set)  │  │ (tickets)    │  │ (reconnect)  │       │
//! │  └──────────────┘  └──────────────┘  └──────────────┘       │
//! │         │                 │                 │               │
//! │         └────────────────┼─────────────────┘                │
//! │                          │                                  │
//! │              ┌───────────▼───────────┐                      │
//! │              │ Receive Worker        │                      │
//! │              │ (channel poll thread) │                      │
//! │              └───────────┬───────────┘                      │
//! │                          │                                  │
//! │                    cook wire (synapse_transport)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Integration contract
//!
//! The host calls [`EngineInstance::tick`] once per render frame from its own
//! thread. Everything asynchronous (socket I/O, cook completion) is folded
//! into host state only at the start of that call, so the registry and the
//! in-flight ticket are never raced.
//!
//! ## Back-pressure
//!
//! At most one cook request is in flight per instance. What happens when the
//! host ticks while one is outstanding is the [`config::CookMode`] policy:
//! stall (`Synchronized`) or drop the tick (`DelayedSynchronized`,
//! `Independent`). A stuck external engine therefore degrades to dropped
//! frames, never to a hung host.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod events;
pub mod instance;
pub mod lifecycle;
pub mod registry;
pub mod scheduler;
pub mod simulation;
pub mod worker;

pub use config::{BridgeConfig, CookMode, RetryPolicy};
pub use error::{BridgeError, BridgeResult};
pub use events::EngineEvent;
pub use instance::{EngineInstance, TickOutcome};
pub use lifecycle::{Connector, LifecycleManager, LifecycleState, LoadOutcome, TcpConnector};
pub use registry::ParameterRegistry;
pub use scheduler::{
    FrameScheduler, FrameStats, FrameTicket, IssuePlan, ResolvedCook, SchedulerState,
};
pub use simulation::{CookReaction, ScriptedEngine};
pub use worker::{BridgeCommand, BridgeEvent, WorkerHandle};

/// Default cook deadline in milliseconds.
///
/// Long enough for a heavyweight compositing graph at 60 Hz to hitch once,
/// short enough that the host visibly drops rather than freezes.
pub const DEFAULT_COOK_TIMEOUT_MS: u64 = 250;

/// Default connect/handshake deadline in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
