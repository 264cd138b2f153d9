//! Fault, reconnect and teardown behavior.
//!
//! Channel loss and device loss are fatal to the instance and must lead to
//! `Faulted`, from which only an explicit reload recovers. Reloads continue
//! the sequence numbering so stale responses from a previous connection can
//! never match a fresh ticket.

use std::time::{Duration, Instant};

use synapse_bridge::{
    BridgeConfig, BridgeError, CookReaction, EngineEvent, EngineInstance, LifecycleState,
    RetryPolicy, ScriptedEngine, TickOutcome,
};
use synapse_core::{
    FenceRef, FrameTime, OsHandle, ParamKind, ParamLayout, ParamScope, ParamSpec,
    SharedTextureDescriptor, TextureDesc, TextureFormat,
};
use synapse_transport::{Channel, ChannelError, LoopbackChannel};

fn layout() -> ParamLayout {
    ParamLayout {
        params: vec![
            ParamSpec::new("opacity", ParamKind::Double, ParamScope::Input),
            ParamSpec::new("brightness", ParamKind::Double, ParamScope::Output),
            ParamSpec::new("composite", ParamKind::Texture, ParamScope::Output),
        ],
    }
}

fn composite_descriptor() -> SharedTextureDescriptor {
    SharedTextureDescriptor {
        os_handle: OsHandle(0xC0),
        desc: TextureDesc::packed(640, 360, TextureFormat::Rgba8),
        fence: FenceRef {
            handle: OsHandle(0xC1),
            ready_value: 1,
        },
    }
}

/// Builds a connector that hands out the given channels in order.
fn connector_for(
    channels: Vec<Box<dyn Channel>>,
) -> impl FnMut() -> Result<Box<dyn Channel>, ChannelError> + Send {
    let mut remaining = channels;
    move || {
        if remaining.is_empty() {
            Err(ChannelError::Disconnected)
        } else {
            Ok(remaining.remove(0))
        }
    }
}

fn tick_until(
    instance: &mut EngineInstance,
    time: &mut FrameTime,
    want: impl Fn(TickOutcome) -> bool,
) -> TickOutcome {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        assert!(Instant::now() < deadline, "tick deadline");
        let outcome = instance.tick(*time);
        *time = time.step(60);
        if want(outcome) {
            return outcome;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_channel_loss_faults_the_instance() {
    let (near, far) = LoopbackChannel::pair();
    let _engine = ScriptedEngine::new(layout())
        .with_reactions(vec![CookReaction::DisconnectNow])
        .spawn(far);

    let mut connector = connector_for(vec![Box::new(near)]);
    let mut instance = EngineInstance::new(BridgeConfig::default());
    instance.load(&mut connector, "scenes/stage.bundle").unwrap();

    let mut time = FrameTime::zero();
    let outcome = tick_until(&mut instance, &mut time, |o| {
        matches!(o, TickOutcome::Faulted)
    });
    assert_eq!(outcome, TickOutcome::Faulted);
    assert_eq!(instance.state(), LifecycleState::Faulted);
    assert!(instance
        .drain_events()
        .iter()
        .any(|e| matches!(e, EngineEvent::Faulted { .. })));

    // Faulted instances refuse to cook until reloaded.
    assert_eq!(instance.tick(time), TickOutcome::NotReady);
}

#[test]
fn test_reload_continues_sequence_numbering() {
    let (near_a, far_a) = LoopbackChannel::pair();
    let _first = ScriptedEngine::new(layout())
        .with_reactions(vec![CookReaction::Respond, CookReaction::DisconnectNow])
        .spawn(far_a);

    let (near_b, far_b) = LoopbackChannel::pair();
    let _second = ScriptedEngine::new(layout()).spawn(far_b);

    let mut connector = connector_for(vec![Box::new(near_a), Box::new(near_b)]);
    let mut instance = EngineInstance::new(BridgeConfig::default());
    instance.load(&mut connector, "scenes/stage.bundle").unwrap();

    let mut time = FrameTime::zero();
    tick_until(&mut instance, &mut time, |o| {
        matches!(o, TickOutcome::Applied { sequence: 1 })
    });
    // Request #2 triggers the scripted disconnect.
    tick_until(&mut instance, &mut time, |o| {
        matches!(o, TickOutcome::Faulted)
    });

    // Explicit reload from Faulted.
    instance.load(&mut connector, "scenes/stage.bundle").unwrap();
    assert_eq!(instance.state(), LifecycleState::Ready);

    let outcome = tick_until(&mut instance, &mut time, |o| {
        matches!(o, TickOutcome::Requested { .. })
    });
    let TickOutcome::Requested { sequence } = outcome else {
        unreachable!();
    };
    assert!(sequence > 2, "sequence {sequence} reused after reload");
}

#[test]
fn test_retries_exhausted_leaves_faulted() {
    let config = BridgeConfig {
        retry: RetryPolicy {
            max_attempts: 2,
            base_backoff_ms: 1,
            max_backoff_ms: 2,
        },
        ..BridgeConfig::default()
    };
    let mut connector = connector_for(Vec::new());
    let mut instance = EngineInstance::new(config);

    let err = instance
        .load(&mut connector, "scenes/stage.bundle")
        .unwrap_err();
    assert!(matches!(err, BridgeError::RetriesExhausted { attempts: 2 }));
    assert_eq!(instance.state(), LifecycleState::Faulted);
    assert_eq!(instance.tick(FrameTime::zero()), TickOutcome::NotReady);
}

#[test]
fn test_device_lost_invalidates_outputs_until_reload() {
    let (near_a, far_a) = LoopbackChannel::pair();
    let _first = ScriptedEngine::new(layout())
        .with_output_textures(vec![("composite".into(), composite_descriptor())])
        .spawn(far_a);

    let (near_b, far_b) = LoopbackChannel::pair();
    let _second = ScriptedEngine::new(layout())
        .with_output_textures(vec![("composite".into(), composite_descriptor())])
        .spawn(far_b);

    let mut connector = connector_for(vec![Box::new(near_a), Box::new(near_b)]);
    let mut instance = EngineInstance::new(BridgeConfig::default());
    instance.load(&mut connector, "scenes/stage.bundle").unwrap();

    let mut time = FrameTime::zero();
    tick_until(&mut instance, &mut time, |o| {
        matches!(o, TickOutcome::Applied { .. })
    });
    assert!(instance.output_texture("composite").is_some());

    instance.notify_device_lost();
    assert_eq!(instance.state(), LifecycleState::Faulted);
    assert!(instance.output_texture("composite").is_none());
    assert!(matches!(
        instance.wait_output_ready("composite", Duration::ZERO),
        Err(BridgeError::UnknownParameter(_))
    ));

    // Reload re-creates the device-side state from scratch.
    instance.load(&mut connector, "scenes/stage.bundle").unwrap();
    tick_until(&mut instance, &mut time, |o| {
        matches!(o, TickOutcome::Applied { .. })
    });
    assert!(instance.output_texture("composite").is_some());
}

#[test]
fn test_unload_is_orderly() {
    let (near, far) = LoopbackChannel::pair();
    let engine = ScriptedEngine::new(layout()).spawn(far);

    let mut connector = connector_for(vec![Box::new(near)]);
    let mut instance = EngineInstance::new(BridgeConfig::default());
    instance.load(&mut connector, "scenes/stage.bundle").unwrap();

    let mut time = FrameTime::zero();
    tick_until(&mut instance, &mut time, |o| {
        matches!(o, TickOutcome::Applied { .. })
    });

    instance.unload().unwrap();
    assert_eq!(instance.state(), LifecycleState::Unloaded);
    assert!(instance
        .drain_events()
        .iter()
        .any(|e| matches!(e, EngineEvent::Unloaded)));

    // The engine saw the teardown frame and exited on its own.
    engine.join().unwrap();

    // Unloading twice is a caller error, not a panic.
    assert!(matches!(
        instance.unload(),
        Err(BridgeError::NotReady { .. })
    ));
}
