//! # Golden Path Cook Test
//!
//! Runs a real engine instance against the scripted engine for a few
//! seconds of simulated host frames and checks the cadence invariants:
//!
//! 1. Host -> cook request with dirty snapshot
//! 2. Engine -> cook response
//! 3. Outputs applied atomically at the next tick
//! 4. Zero timeouts, zero stale applications

use std::time::Duration;

use synapse_bridge::{
    BridgeConfig, EngineInstance, ScriptedEngine, TickOutcome,
};
use synapse_core::{FrameTime, ParamKind, ParamLayout, ParamScope, ParamSpec, ParamValue};
use synapse_transport::{Channel, ChannelError, LoopbackChannel};

const FRAMES: u32 = 240;

fn main() {
    println!("==================================================");
    println!("        SYNAPSE - GOLDEN PATH COOK TEST");
    println!("  host tick -> cook request -> response -> apply");
    println!("==================================================");

    let layout = ParamLayout {
        params: vec![
            ParamSpec::new("opacity", ParamKind::Double, ParamScope::Input),
            ParamSpec::new("brightness", ParamKind::Double, ParamScope::Output),
        ],
    };

    let (near, far) = LoopbackChannel::pair();
    let engine = ScriptedEngine::new(layout)
        .with_outputs(vec![("brightness".into(), ParamValue::Double(0.8))]);
    let engine_thread = engine.spawn(far);

    let mut channels = vec![Box::new(near) as Box<dyn Channel>];
    let mut connector = move || channels.pop().ok_or(ChannelError::Disconnected);

    let mut instance = EngineInstance::new(BridgeConfig::default());
    if let Err(e) = instance.load(&mut connector, "scenes/golden.bundle") {
        println!("FAIL: load: {e}");
        std::process::exit(1);
    }

    let mut time = FrameTime::zero();
    for frame in 0..FRAMES {
        let opacity = f64::from(frame) / f64::from(FRAMES);
        instance
            .set("opacity", ParamValue::Double(opacity))
            .expect("declared input");

        match instance.tick(time) {
            TickOutcome::Faulted | TickOutcome::NotReady => {
                println!("FAIL: instance left the cook loop at frame {frame}");
                std::process::exit(1);
            }
            _ => {}
        }
        time = time.step(60);
        std::thread::sleep(Duration::from_millis(1));
    }

    let stats = instance.frame_stats();
    println!("frames ticked:    {FRAMES}");
    println!("cooks requested:  {}", stats.requested);
    println!("cooks applied:    {}", stats.applied);
    println!("ticks dropped:    {}", stats.dropped_ticks);
    println!("timeouts:         {}", stats.timeouts);
    println!("stale responses:  {}", stats.stale_responses);
    println!(
        "final brightness: {:?}",
        instance.get("brightness")
    );

    let pass = stats.applied > 0
        && stats.timeouts == 0
        && instance.get("brightness") == Some(ParamValue::Double(0.8));

    if let Err(e) = instance.unload() {
        println!("FAIL: unload: {e}");
        std::process::exit(1);
    }
    let _ = engine_thread.join();

    if pass {
        println!("PASS");
    } else {
        println!("FAIL");
        std::process::exit(1);
    }
}
