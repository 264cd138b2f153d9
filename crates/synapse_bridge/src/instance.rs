//! # Engine Instance
//!
//! The facade the host application owns: one instance per connection to the
//! external compositing engine.
//!
//! ## Integration contract
//!
//! The host frame loop drives the instance synchronously through
//! [`EngineInstance::tick`]. Asynchronous completions (cook responses,
//! diagnostics, channel loss) are queued by the receive worker and folded
//! into host state only at the start of the next tick, in this order:
//!
//! 1. integrate worker events (responses resolve or are discarded as stale)
//! 2. abandon the in-flight ticket if it missed its deadline
//! 3. apply the resolved cook atomically (parameters and textures together)
//! 4. snapshot dirty inputs and issue the next cook request, per cook mode
//!
//! No step blocks on the external engine; a stuck engine shows up as
//! [`TickOutcome::Dropped`] or [`TickOutcome::TimedOut`], never a hang.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use synapse_core::{
    FrameTime, ParamKind, ParamSpec, ParamValue, SharedTextureDescriptor, TextureToken,
};
use synapse_gpu::{
    select_backend, FenceWait, GpuBackend, LocalTexture, ResourceBridgeError, SharedTextureHandle,
};
use synapse_transport::Message;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::events::EngineEvent;
use crate::lifecycle::{Connector, LifecycleManager, LifecycleState};
use crate::registry::ParameterRegistry;
use crate::scheduler::{FrameScheduler, FrameStats, IssuePlan, ResolvedCook};
use crate::worker::{BridgeEvent, WorkerHandle};

/// Per-frame result of [`EngineInstance::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The instance is not in `Ready`; nothing happened.
    NotReady,
    /// A new cook request was issued.
    Requested {
        /// Sequence number of the new ticket.
        sequence: u64,
    },
    /// A cook resolved and its outputs were applied this tick.
    Applied {
        /// Sequence number of the applied cook.
        sequence: u64,
    },
    /// A request is in flight and the cook mode says to stall: re-tick.
    Busy,
    /// A request is in flight and the cook mode says to skip this tick.
    Dropped,
    /// The in-flight ticket missed its deadline and was abandoned.
    TimedOut {
        /// Sequence number of the abandoned ticket.
        sequence: u64,
    },
    /// The instance faulted during this tick.
    Faulted,
}

/// One connection to the external compositing engine.
pub struct EngineInstance {
    config: BridgeConfig,
    lifecycle: LifecycleManager,
    registry: ParameterRegistry,
    scheduler: FrameScheduler,
    backend: Option<Box<dyn GpuBackend>>,
    worker: Option<WorkerHandle>,
    events: Vec<EngineEvent>,
    discontinuity: bool,
    /// Host-exported texture inputs by parameter name.
    input_textures: HashMap<String, (SharedTextureHandle, SharedTextureDescriptor)>,
    /// Imported texture outputs by parameter name, with their ready values.
    output_textures: HashMap<String, (SharedTextureHandle, u64)>,
}

impl EngineInstance {
    /// Creates an unloaded instance.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        let scheduler = FrameScheduler::new(config.cook_mode, config.cook_timeout());
        Self {
            lifecycle: LifecycleManager::new(config.clone()),
            registry: ParameterRegistry::new(),
            scheduler,
            backend: None,
            worker: None,
            events: Vec::new(),
            discontinuity: false,
            input_textures: HashMap::new(),
            output_textures: HashMap::new(),
            config,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Frame cadence statistics.
    #[must_use]
    pub fn frame_stats(&self) -> FrameStats {
        *self.scheduler.stats()
    }

    /// The configuration this instance runs with.
    #[must_use]
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Connects, handshakes and loads content.
    ///
    /// Works from `Unloaded` and, as the explicit reload path, from
    /// `Faulted`. Sequence numbering continues across reloads; stale
    /// responses from a previous connection can never match a new ticket.
    ///
    /// # Errors
    ///
    /// See [`LifecycleManager::load`].
    pub fn load(&mut self, connector: &mut dyn Connector, descriptor: &str) -> BridgeResult<()> {
        if self.lifecycle.state() == LifecycleState::Faulted {
            self.teardown_runtime(false);
        }

        let outcome = self
            .lifecycle
            .load(connector, descriptor, &mut self.events)?;

        self.registry.declare_layout(&outcome.layout);
        let backend = select_backend(outcome.api);
        backend.reset();
        self.backend = Some(backend);
        self.worker = Some(WorkerHandle::spawn(
            outcome.channel,
            self.config.event_capacity,
        ));
        self.events.push(EngineEvent::Loaded {
            layout: outcome.layout,
        });
        Ok(())
    }

    /// Orderly teardown: cancel the in-flight cook, notify the engine,
    /// release every shared resource.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotReady`] unless the instance is `Ready` or
    /// `Faulted`.
    pub fn unload(&mut self) -> BridgeResult<()> {
        match self.lifecycle.state() {
            LifecycleState::Ready | LifecycleState::Faulted => {
                self.lifecycle.begin_unload();
                self.teardown_runtime(true);
                self.lifecycle.finish_unload();
                self.events.push(EngineEvent::Unloaded);
                Ok(())
            }
            other => Err(BridgeError::NotReady {
                state: other.to_string(),
            }),
        }
    }

    /// Writes an input parameter; it reaches the engine with the next cook
    /// request (or an explicit [`Self::flush_inputs`]).
    ///
    /// # Errors
    ///
    /// See [`ParameterRegistry::set`].
    pub fn set(&self, name: &str, value: ParamValue) -> BridgeResult<()> {
        self.registry.set(name, value)
    }

    /// Reads the current value of a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.registry.get(name)
    }

    /// Returns the declared spec of a parameter.
    #[must_use]
    pub fn param_spec(&self, name: &str) -> Option<ParamSpec> {
        self.registry.spec(name)
    }

    /// Pushes dirty inputs to the engine outside the cook cadence.
    ///
    /// Useful while the host is paused but the operator keeps editing.
    /// Returns the number of updates sent.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotReady`] unless `Ready`; [`BridgeError::Faulted`]
    /// if the worker is gone.
    pub fn flush_inputs(&mut self) -> BridgeResult<usize> {
        if !self.lifecycle.is_ready() {
            return Err(BridgeError::NotReady {
                state: self.lifecycle.state().to_string(),
            });
        }
        let updates = self.registry.drain_dirty();
        if updates.is_empty() {
            return Ok(0);
        }
        let count = updates.len();
        self.send_or_fault(Message::ParamSet { updates })?;
        Ok(count)
    }

    /// Marks the host timeline as discontinuous (seek, loop, reset); the
    /// flag rides on the next cook request.
    pub fn mark_discontinuity(&mut self) {
        self.discontinuity = true;
    }

    /// Shares a host texture as the value of texture input `name`.
    ///
    /// The parameter is marked dirty; the descriptor travels with the next
    /// cook request. Re-exporting replaces (and releases) the previous
    /// share.
    ///
    /// # Errors
    ///
    /// Registry validation errors, plus any [`ResourceBridgeError`] from
    /// the backend.
    pub fn export_input_texture(
        &mut self,
        name: &str,
        texture: LocalTexture,
    ) -> BridgeResult<TextureToken> {
        let spec = self
            .registry
            .spec(name)
            .ok_or_else(|| BridgeError::UnknownParameter(name.to_string()))?;
        if !spec.is_input() {
            return Err(BridgeError::NotAnInput(name.to_string()));
        }
        if spec.kind != ParamKind::Texture {
            return Err(BridgeError::ParameterTypeMismatch {
                name: name.to_string(),
                expected: spec.kind,
                got: ParamKind::Texture,
            });
        }

        let backend = self.backend.as_ref().ok_or_else(|| BridgeError::NotReady {
            state: self.lifecycle.state().to_string(),
        })?;
        let (handle, descriptor) = backend.export_texture(&texture)?;

        if let Some((old, _)) = self
            .input_textures
            .insert(name.to_string(), (handle, descriptor))
        {
            let _ = backend.release_texture(&old);
        }
        self.registry.set(name, ParamValue::Texture(handle.token))?;
        Ok(handle.token)
    }

    /// Records that the host finished writing input texture `name`.
    ///
    /// # Errors
    ///
    /// `UnknownParameter` if nothing is exported under that name; fence
    /// errors from the backend.
    pub fn signal_input_ready(&mut self, name: &str, value: u64) -> BridgeResult<()> {
        let backend = self.backend.as_ref().ok_or_else(|| BridgeError::NotReady {
            state: self.lifecycle.state().to_string(),
        })?;
        let (handle, _) = self
            .input_textures
            .get(name)
            .ok_or_else(|| BridgeError::UnknownParameter(name.to_string()))?;
        backend.signal_fence(handle, value)?;
        Ok(())
    }

    /// Returns the live handle of texture output `name`, if a cook has
    /// produced one.
    #[must_use]
    pub fn output_texture(&self, name: &str) -> Option<SharedTextureHandle> {
        self.output_textures.get(name).map(|(handle, _)| *handle)
    }

    /// Waits until texture output `name` is safe to sample.
    ///
    /// Bounded by `timeout`; never waits on "latest", only on the exact
    /// value the producing cook announced.
    ///
    /// # Errors
    ///
    /// `UnknownParameter` if no such output exists; fence errors from the
    /// backend.
    pub fn wait_output_ready(&self, name: &str, timeout: Duration) -> BridgeResult<FenceWait> {
        let backend = self.backend.as_ref().ok_or_else(|| BridgeError::NotReady {
            state: self.lifecycle.state().to_string(),
        })?;
        let (handle, ready_value) = self
            .output_textures
            .get(name)
            .ok_or_else(|| BridgeError::UnknownParameter(name.to_string()))?;
        Ok(backend.wait_fence(handle, *ready_value, timeout)?)
    }

    /// Reports that the host's GPU device was lost.
    ///
    /// Invalidates every shared texture and faults the instance; an
    /// explicit reload re-creates all resources.
    pub fn notify_device_lost(&mut self) {
        if let Some(backend) = &self.backend {
            backend.notify_device_lost();
        }
        self.input_textures.clear();
        self.output_textures.clear();
        self.fault("gpu device lost");
    }

    /// Drains every event surfaced since the last call.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Runs one host frame tick. See the module docs for the exact order.
    pub fn tick(&mut self, time: FrameTime) -> TickOutcome {
        if !self.lifecycle.is_ready() {
            return TickOutcome::NotReady;
        }

        // 1. Fold asynchronous completions into host state.
        let mut incoming = Vec::new();
        if let Some(worker) = &self.worker {
            worker.drain_events(&mut incoming);
        }
        for event in incoming {
            match event {
                BridgeEvent::Message(message) => {
                    if !self.integrate_message(message) {
                        return TickOutcome::Faulted;
                    }
                }
                BridgeEvent::ChannelLost(reason) => {
                    self.fault(&reason);
                    return TickOutcome::Faulted;
                }
            }
        }

        let now = Instant::now();

        // 2. Deadline check; surfaced exactly once per ticket.
        let timed_out = self.scheduler.poll_timeout(now);
        if let Some(sequence) = timed_out {
            self.events.push(EngineEvent::FrameTimedOut { sequence });
            self.send_quiet(Message::CancelFrame { sequence });
        }

        // 3. Apply the resolved cook, all-or-nothing.
        let mut applied = None;
        if let Some(cook) = self.scheduler.take_resolved() {
            match self.apply_cook(&cook) {
                Ok(()) => {
                    applied = Some(cook.sequence);
                    self.events
                        .push(EngineEvent::FrameFinished { sequence: cook.sequence });
                }
                Err(BridgeError::Resource(ResourceBridgeError::DeviceLost)) => {
                    self.fault("gpu device lost while applying cook");
                    return TickOutcome::Faulted;
                }
                Err(e) => {
                    tracing::warn!("dropping cook {} output: {e}", cook.sequence);
                }
            }
        }

        // 4. Issue the next request, per cook mode.
        let mut requested = None;
        let mut busy = false;
        match self.scheduler.plan_tick() {
            IssuePlan::Issue => match self.issue_request(now, time) {
                Ok(sequence) => requested = Some(sequence),
                Err(_) => return TickOutcome::Faulted,
            },
            IssuePlan::Busy => busy = true,
            IssuePlan::Drop => self.scheduler.record_dropped_tick(),
        }

        if let Some(sequence) = timed_out {
            return TickOutcome::TimedOut { sequence };
        }
        if let Some(sequence) = applied {
            return TickOutcome::Applied { sequence };
        }
        if let Some(sequence) = requested {
            return TickOutcome::Requested { sequence };
        }
        if busy {
            return TickOutcome::Busy;
        }
        TickOutcome::Dropped
    }

    /// Integrates one engine message; false means the instance faulted.
    fn integrate_message(&mut self, message: Message) -> bool {
        match message {
            Message::CookResponse {
                sequence,
                outputs,
                textures,
            } => {
                let _ = self.scheduler.handle_response(sequence, outputs, textures);
            }
            Message::EngineMessage { severity, text } => {
                self.events.push(EngineEvent::Message { severity, text });
            }
            Message::LayoutChanged { layout } => {
                self.registry.declare_layout(&layout);
                self.events.push(EngineEvent::LayoutChanged { layout });
            }
            Message::Teardown => {
                self.fault("engine requested teardown");
                return false;
            }
            Message::ProtocolError { code, detail } => {
                self.fault(&format!("protocol error {code}: {detail}"));
                return false;
            }
            other => {
                tracing::debug!(
                    "ignoring unexpected frame {:?} during cook loop",
                    other.message_type()
                );
            }
        }
        true
    }

    /// Snapshots dirty inputs and sends the next cook request.
    fn issue_request(&mut self, now: Instant, time: FrameTime) -> BridgeResult<u64> {
        let inputs = self.registry.drain_dirty();
        let mut textures = Vec::new();
        for (name, value) in &inputs {
            if let ParamValue::Texture(token) = value {
                if let Some((handle, descriptor)) = self.input_textures.get(name) {
                    if handle.token == *token {
                        textures.push((name.clone(), *descriptor));
                    }
                }
            }
        }
        let discontinuity = std::mem::take(&mut self.discontinuity);

        let (sequence, message) = {
            let ticket = self
                .scheduler
                .issue(now, time, discontinuity, inputs, textures);
            (
                ticket.sequence,
                Message::CookRequest {
                    sequence: ticket.sequence,
                    time: ticket.time,
                    discontinuity: ticket.discontinuity,
                    inputs: ticket.inputs.clone(),
                    textures: ticket.textures.clone(),
                },
            )
        };
        self.send_or_fault(message)?;
        Ok(sequence)
    }

    /// Applies a resolved cook atomically: imports its textures, then
    /// commits parameters and texture tokens together or not at all.
    fn apply_cook(&mut self, cook: &ResolvedCook) -> BridgeResult<()> {
        if cook.textures.is_empty() {
            return self.registry.apply_outputs(&cook.outputs);
        }

        let backend = self.backend.as_ref().ok_or_else(|| BridgeError::NotReady {
            state: self.lifecycle.state().to_string(),
        })?;

        let release_all = |backend: &dyn GpuBackend,
                           imported: &[(String, SharedTextureHandle, u64)]| {
            for (_, handle, _) in imported {
                let _ = backend.release_texture(handle);
            }
        };

        let mut combined = cook.outputs.clone();
        let mut imported: Vec<(String, SharedTextureHandle, u64)> = Vec::new();

        for (name, descriptor) in &cook.textures {
            let spec = match self.registry.spec(name) {
                Some(spec) => spec,
                None => {
                    release_all(backend.as_ref(), &imported);
                    return Err(BridgeError::UnknownParameter(name.clone()));
                }
            };
            if spec.is_input() {
                release_all(backend.as_ref(), &imported);
                return Err(BridgeError::NotAnOutput(name.clone()));
            }
            if spec.kind != ParamKind::Texture {
                release_all(backend.as_ref(), &imported);
                return Err(BridgeError::ParameterTypeMismatch {
                    name: name.clone(),
                    expected: spec.kind,
                    got: ParamKind::Texture,
                });
            }

            match backend.import_texture(descriptor) {
                Ok(handle) => {
                    // Ownership transfer is a protocol event: the engine
                    // queued its signal before sending the response.
                    if descriptor.fence.ready_value > 0 {
                        if let Err(e) = backend.signal_fence(&handle, descriptor.fence.ready_value)
                        {
                            release_all(backend.as_ref(), &imported);
                            let _ = backend.release_texture(&handle);
                            return Err(e.into());
                        }
                    }
                    combined.push((name.clone(), ParamValue::Texture(handle.token)));
                    imported.push((name.clone(), handle, descriptor.fence.ready_value));
                }
                Err(e) => {
                    release_all(backend.as_ref(), &imported);
                    return Err(e.into());
                }
            }
        }

        if let Err(e) = self.registry.apply_outputs(&combined) {
            release_all(backend.as_ref(), &imported);
            return Err(e);
        }

        for (name, handle, ready_value) in imported {
            if let Some((old, _)) = self.output_textures.insert(name, (handle, ready_value)) {
                let _ = backend.release_texture(&old);
            }
        }
        Ok(())
    }

    /// Sends through the worker or faults the instance.
    fn send_or_fault(&mut self, message: Message) -> BridgeResult<()> {
        let sent = self
            .worker
            .as_ref()
            .map(|worker| worker.send(message))
            .unwrap_or(false);
        if sent {
            Ok(())
        } else {
            self.fault("command queue unavailable");
            Err(BridgeError::Faulted("command queue unavailable".to_string()))
        }
    }

    /// Best-effort send; failures are already fatal elsewhere.
    fn send_quiet(&mut self, message: Message) {
        if let Some(worker) = &self.worker {
            let _ = worker.send(message);
        }
    }

    /// Faults the instance: cancel the ticket, stop the worker, surface the
    /// event. Shared textures stay registered so a reload can release them.
    fn fault(&mut self, reason: &str) {
        let _ = self.scheduler.cancel_in_flight();
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
        self.lifecycle.fault(reason);
        self.events.push(EngineEvent::Faulted {
            reason: reason.to_string(),
        });
    }

    /// Releases every runtime resource. `orderly` additionally tells the
    /// engine (cancel + teardown) before the worker stops.
    fn teardown_runtime(&mut self, orderly: bool) {
        let cancelled = self.scheduler.cancel_in_flight();
        if let Some(worker) = self.worker.take() {
            if orderly {
                if let Some(sequence) = cancelled {
                    let _ = worker.send(Message::CancelFrame { sequence });
                }
                let _ = worker.send(Message::Teardown);
            }
            worker.shutdown();
        }
        // Dropping the backend releases every slot without waiting on any
        // unresolved fence; the producing process may never signal them.
        self.input_textures.clear();
        self.output_textures.clear();
        self.backend = None;
    }
}

impl Drop for EngineInstance {
    fn drop(&mut self) {
        self.teardown_runtime(true);
    }
}
