//! # Lifecycle Manager
//!
//! Load, connect, reconnect and teardown of one external engine instance.
//!
//! ## State machine
//!
//! ```text
//! Unloaded ──load──▶ Loading ──handshake ok──▶ Ready
//!     ▲                 │                        │
//!     │                 │ retries exhausted      │ channel / device lost
//!     │                 ▼                        ▼
//!     └──unload─── Unloading ◀──unload──────  Faulted
//!                                  (only explicit reload leaves Faulted)
//! ```
//!
//! Reconnect attempts are bounded and spaced by exponential back-off with
//! jitter, so a crashed engine process is not hammered in lockstep by every
//! host instance at once.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use synapse_core::{CapabilitySet, GpuApi, ParamLayout, Severity};
use synapse_gpu::negotiate_api;
use synapse_transport::{Channel, ChannelError, Message, TcpChannel};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::events::EngineEvent;

/// Lifecycle state of an engine instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    /// No engine process attached.
    Unloaded = 0,
    /// Connecting and loading content.
    Loading = 1,
    /// Cooking loop available.
    Ready = 2,
    /// Orderly teardown in progress.
    Unloading = 3,
    /// Unrecoverable transport or device error; reload required.
    Faulted = 4,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Unloading => "unloading",
            Self::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Produces channels to the external engine process.
///
/// Separate from the channel itself so reconnects can mint fresh
/// connections, and so tests can hand the bridge loopback endpoints.
pub trait Connector: Send {
    /// Establishes one new channel.
    ///
    /// # Errors
    ///
    /// Any [`ChannelError`]; the lifecycle manager retries per policy.
    fn connect(&mut self) -> Result<Box<dyn Channel>, ChannelError>;
}

impl<F> Connector for F
where
    F: FnMut() -> Result<Box<dyn Channel>, ChannelError> + Send,
{
    fn connect(&mut self) -> Result<Box<dyn Channel>, ChannelError> {
        self()
    }
}

/// Connects to an engine process over TCP.
pub struct TcpConnector {
    addr: SocketAddr,
    timeout: Duration,
}

impl TcpConnector {
    /// Creates a connector for the given address.
    #[must_use]
    pub const fn new(addr: SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout }
    }
}

impl Connector for TcpConnector {
    fn connect(&mut self) -> Result<Box<dyn Channel>, ChannelError> {
        Ok(Box::new(TcpChannel::connect(self.addr, self.timeout)?))
    }
}

/// Everything a successful load hands back to the instance.
pub struct LoadOutcome {
    /// The established channel, ready for the receive worker.
    pub channel: Box<dyn Channel>,
    /// Parameter layout of the loaded content.
    pub layout: ParamLayout,
    /// Negotiated GPU API.
    pub api: GpuApi,
    /// Capabilities the engine advertised.
    pub engine_capabilities: CapabilitySet,
}

impl std::fmt::Debug for LoadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOutcome")
            .field("channel", &"<dyn Channel>")
            .field("layout", &self.layout)
            .field("api", &self.api)
            .field("engine_capabilities", &self.engine_capabilities)
            .finish()
    }
}

/// Lifecycle state machine and reconnect policy for one instance.
pub struct LifecycleManager {
    state: LifecycleState,
    config: BridgeConfig,
    rng: StdRng,
}

impl LifecycleManager {
    /// Creates a manager in `Unloaded`.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
            ^ u64::from(std::process::id());
        Self {
            state: LifecycleState::Unloaded,
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Returns true if the cooking loop may run.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }

    /// Escalates to `Faulted`.
    pub fn fault(&mut self, reason: &str) {
        tracing::error!("engine instance faulted: {reason}");
        self.state = LifecycleState::Faulted;
    }

    /// Enters `Unloading`.
    pub fn begin_unload(&mut self) {
        self.state = LifecycleState::Unloading;
    }

    /// Completes teardown, returning to `Unloaded`.
    pub fn finish_unload(&mut self) {
        self.state = LifecycleState::Unloaded;
    }

    /// Connects, handshakes and loads `descriptor`, retrying per policy.
    ///
    /// Diagnostic messages received during the handshake are appended to
    /// `events`.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotReady`] if called from a state other than
    /// `Unloaded` or `Faulted`; [`BridgeError::RetriesExhausted`] (leaving
    /// the instance `Faulted`) when every attempt fails.
    pub fn load(
        &mut self,
        connector: &mut dyn Connector,
        descriptor: &str,
        events: &mut Vec<EngineEvent>,
    ) -> BridgeResult<LoadOutcome> {
        if !matches!(
            self.state,
            LifecycleState::Unloaded | LifecycleState::Faulted
        ) {
            return Err(BridgeError::NotReady {
                state: self.state.to_string(),
            });
        }

        self.state = LifecycleState::Loading;
        let max_attempts = self.config.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.connect_once(connector, descriptor, events) {
                Ok(outcome) => {
                    tracing::info!(
                        "engine instance ready: '{}' over {:?} ({} params)",
                        descriptor,
                        outcome.api,
                        outcome.layout.len()
                    );
                    self.state = LifecycleState::Ready;
                    return Ok(outcome);
                }
                Err(e) => {
                    tracing::warn!("load attempt {attempt}/{max_attempts} failed: {e}");
                    if attempt < max_attempts {
                        std::thread::sleep(self.backoff_delay(attempt));
                    }
                }
            }
        }

        self.state = LifecycleState::Faulted;
        Err(BridgeError::RetriesExhausted {
            attempts: max_attempts,
        })
    }

    /// Back-off before the attempt after `attempt` failures: exponential,
    /// capped, plus jitter of up to half the base step.
    pub fn backoff_delay(&mut self, attempt: u32) -> Duration {
        let base = self.config.retry.base_backoff_ms.max(1);
        let shift = attempt.saturating_sub(1).min(16);
        let exp = base.saturating_mul(1u64 << shift);
        let capped = exp.min(self.config.retry.max_backoff_ms);
        let jitter = self.rng.gen_range(0..=base / 2);
        Duration::from_millis(capped + jitter)
    }

    /// One connect + handshake + content load, bounded by the connect
    /// deadline.
    fn connect_once(
        &mut self,
        connector: &mut dyn Connector,
        descriptor: &str,
        events: &mut Vec<EngineEvent>,
    ) -> BridgeResult<LoadOutcome> {
        let mut channel = connector.connect()?;
        let deadline = Instant::now() + self.config.connect_timeout();
        let host_caps = self.config.host_capabilities();

        channel.send(&Message::Hello {
            capabilities: host_caps.clone(),
        })?;
        let engine_capabilities = wait_for(
            channel.as_mut(),
            deadline,
            events,
            "hello_ack",
            |message| match message {
                Message::HelloAck { capabilities } => Some(capabilities),
                _ => None,
            },
        )?;

        let api = negotiate_api(&host_caps, &engine_capabilities)?;

        channel.send(&Message::LoadContent {
            descriptor: descriptor.to_string(),
        })?;
        let layout = wait_for(
            channel.as_mut(),
            deadline,
            events,
            "content_loaded",
            |message| match message {
                Message::ContentLoaded { layout } => Some(layout),
                _ => None,
            },
        )?;

        Ok(LoadOutcome {
            channel,
            layout,
            api,
            engine_capabilities,
        })
    }
}

/// Polls `channel` until `matcher` accepts a message or `deadline` passes.
///
/// Engine diagnostics arriving in between are forwarded to `events`.
fn wait_for<T>(
    channel: &mut dyn Channel,
    deadline: Instant,
    events: &mut Vec<EngineEvent>,
    what: &str,
    mut matcher: impl FnMut(Message) -> Option<T>,
) -> BridgeResult<T> {
    let mut inbox = Vec::new();
    loop {
        channel.poll(&mut inbox)?;
        for message in inbox.drain(..) {
            match message {
                Message::EngineMessage { severity, text } => {
                    if severity == Severity::Error {
                        return Err(BridgeError::HandshakeFailed(text));
                    }
                    events.push(EngineEvent::Message { severity, text });
                }
                Message::ProtocolError { code, detail } => {
                    return Err(BridgeError::HandshakeFailed(format!(
                        "protocol error {code}: {detail}"
                    )));
                }
                other => {
                    if let Some(found) = matcher(other) {
                        return Ok(found);
                    }
                }
            }
        }
        if Instant::now() >= deadline {
            return Err(BridgeError::HandshakeFailed(format!(
                "timed out waiting for {what}"
            )));
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}
