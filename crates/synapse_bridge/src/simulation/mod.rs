//! # Scripted Engine Simulation
//!
//! An in-process stand-in for the external engine, used by integration
//! tests and the golden-path binary.
//!
//! ## Design
//!
//! The scripted engine runs the far side of a loopback channel on its own
//! thread and speaks the real wire protocol: the bridge under test cannot
//! tell it from a live engine process. Handshake and content load are
//! handled automatically; cook behavior is driven by a per-request script
//! so tests can inject delays, stale responses and disconnects.

use std::collections::VecDeque;
use std::thread::JoinHandle;
use std::time::Duration;

use synapse_core::{
    CapabilitySet, GpuApi, ParamLayout, ParamValue, Severity, SharedTextureDescriptor,
    TextureFormat,
};
use synapse_transport::{Channel, LoopbackChannel, Message};

/// How a scripted engine reacts to one cook request.
#[derive(Clone, Debug)]
pub enum CookReaction {
    /// Respond normally with the configured output template.
    Respond,
    /// First send a response bearing a stale sequence number, then the real
    /// one. Exercises the stale-response discard policy.
    RespondWithStale {
        /// Outputs carried by the stale response; tests pick values that
        /// must never become visible.
        stale_outputs: Vec<(String, ParamValue)>,
    },
    /// Sleep before responding, to exercise deadlines.
    DelayedRespond {
        /// Delay before the response is sent.
        delay_ms: u64,
    },
    /// Never respond to this request.
    Silent,
    /// Drop the channel mid-flight.
    DisconnectNow,
}

/// Scripted stand-in for the external compositing engine.
pub struct ScriptedEngine {
    layout: ParamLayout,
    capabilities: CapabilitySet,
    outputs: Vec<(String, ParamValue)>,
    output_textures: Vec<(String, SharedTextureDescriptor)>,
    load_messages: Vec<(Severity, String)>,
    reactions: VecDeque<CookReaction>,
}

impl ScriptedEngine {
    /// Creates an engine that loads `layout` and answers every cook with an
    /// empty output set.
    #[must_use]
    pub fn new(layout: ParamLayout) -> Self {
        Self {
            layout,
            capabilities: CapabilitySet {
                gpu_apis: vec![GpuApi::D3D12, GpuApi::Vulkan, GpuApi::D3D11],
                formats: TextureFormat::ALL.to_vec(),
            },
            outputs: Vec::new(),
            output_textures: Vec::new(),
            load_messages: Vec::new(),
            reactions: VecDeque::new(),
        }
    }

    /// Overrides the advertised capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sets the output template sent with every normal response.
    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<(String, ParamValue)>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Sets the texture outputs sent with every normal response.
    #[must_use]
    pub fn with_output_textures(
        mut self,
        textures: Vec<(String, SharedTextureDescriptor)>,
    ) -> Self {
        self.output_textures = textures;
        self
    }

    /// Adds diagnostics emitted during content load.
    #[must_use]
    pub fn with_load_messages(mut self, messages: Vec<(Severity, String)>) -> Self {
        self.load_messages = messages;
        self
    }

    /// Queues reactions for successive cook requests; once the queue is
    /// empty every further request gets [`CookReaction::Respond`].
    #[must_use]
    pub fn with_reactions(mut self, reactions: Vec<CookReaction>) -> Self {
        self.reactions = reactions.into();
        self
    }

    /// Runs the engine on its own thread over `channel`.
    ///
    /// The thread exits on `Teardown`, on channel loss, or when a scripted
    /// disconnect fires.
    #[must_use]
    pub fn spawn(self, channel: LoopbackChannel) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("scripted-engine".to_string())
            .spawn(move || self.run(channel))
            .unwrap_or_else(|e| panic!("failed to spawn scripted engine: {e}"))
    }

    fn run(mut self, mut channel: LoopbackChannel) {
        let mut inbox = Vec::new();
        loop {
            if channel.poll(&mut inbox).is_err() {
                return;
            }
            for message in inbox.drain(..) {
                if !self.handle(&mut channel, message) {
                    return;
                }
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Handles one message; false means "stop the engine thread".
    fn handle(&mut self, channel: &mut LoopbackChannel, message: Message) -> bool {
        match message {
            Message::Hello { .. } => channel
                .send(&Message::HelloAck {
                    capabilities: self.capabilities.clone(),
                })
                .is_ok(),
            Message::LoadContent { .. } => {
                for (severity, text) in &self.load_messages {
                    if channel
                        .send(&Message::EngineMessage {
                            severity: *severity,
                            text: text.clone(),
                        })
                        .is_err()
                    {
                        return false;
                    }
                }
                channel
                    .send(&Message::ContentLoaded {
                        layout: self.layout.clone(),
                    })
                    .is_ok()
            }
            Message::ParamSet { updates } => channel
                .send(&Message::EngineMessage {
                    severity: Severity::Info,
                    text: format!("applied {} parameter updates", updates.len()),
                })
                .is_ok(),
            Message::CookRequest { sequence, .. } => {
                let reaction = self.reactions.pop_front().unwrap_or(CookReaction::Respond);
                self.react(channel, sequence, reaction)
            }
            Message::Teardown => false,
            // CancelFrame and anything else needs no answer.
            _ => true,
        }
    }

    fn react(
        &mut self,
        channel: &mut LoopbackChannel,
        sequence: u64,
        reaction: CookReaction,
    ) -> bool {
        match reaction {
            CookReaction::Respond => self.respond(channel, sequence),
            CookReaction::RespondWithStale { stale_outputs } => {
                let stale = Message::CookResponse {
                    sequence: sequence.saturating_sub(1),
                    outputs: stale_outputs,
                    textures: Vec::new(),
                };
                if channel.send(&stale).is_err() {
                    return false;
                }
                self.respond(channel, sequence)
            }
            CookReaction::DelayedRespond { delay_ms } => {
                std::thread::sleep(Duration::from_millis(delay_ms));
                self.respond(channel, sequence)
            }
            CookReaction::Silent => true,
            CookReaction::DisconnectNow => false,
        }
    }

    fn respond(&self, channel: &mut LoopbackChannel, sequence: u64) -> bool {
        channel
            .send(&Message::CookResponse {
                sequence,
                outputs: self.outputs.clone(),
                textures: self.output_textures.clone(),
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_core::{ParamKind, ParamScope, ParamSpec};

    fn layout() -> ParamLayout {
        ParamLayout {
            params: vec![ParamSpec::new(
                "opacity",
                ParamKind::Double,
                ParamScope::Input,
            )],
        }
    }

    /// Polls until `count` messages arrive or a deadline passes.
    fn recv(channel: &mut LoopbackChannel, count: usize) -> Vec<Message> {
        let mut out = Vec::new();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while out.len() < count {
            assert!(std::time::Instant::now() < deadline, "recv deadline");
            channel.poll(&mut out).unwrap();
            std::thread::sleep(Duration::from_millis(1));
        }
        out
    }

    #[test]
    fn test_handshake_load_and_cook() {
        let (mut host, far) = LoopbackChannel::pair();
        let engine = ScriptedEngine::new(layout())
            .with_outputs(vec![("brightness".into(), ParamValue::Double(0.8))]);
        let handle = engine.spawn(far);

        host.send(&Message::Hello {
            capabilities: CapabilitySet::new(),
        })
        .unwrap();
        assert!(matches!(
            recv(&mut host, 1)[0],
            Message::HelloAck { .. }
        ));

        host.send(&Message::LoadContent {
            descriptor: "x".into(),
        })
        .unwrap();
        assert!(matches!(
            recv(&mut host, 1)[0],
            Message::ContentLoaded { .. }
        ));

        host.send(&Message::CookRequest {
            sequence: 1,
            time: synapse_core::FrameTime::zero(),
            discontinuity: false,
            inputs: Vec::new(),
            textures: Vec::new(),
        })
        .unwrap();
        let response = recv(&mut host, 1);
        assert_eq!(
            response[0],
            Message::CookResponse {
                sequence: 1,
                outputs: vec![("brightness".into(), ParamValue::Double(0.8))],
                textures: Vec::new(),
            }
        );

        host.send(&Message::Teardown).unwrap();
        handle.join().unwrap();
    }
}
