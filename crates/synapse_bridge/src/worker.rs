//! # Receive Worker
//!
//! The dedicated I/O thread that owns the transport channel.
//!
//! ## Design
//!
//! - The worker is the only code touching the channel after load; the host
//!   tick talks to it through a bounded command/event channel pair
//! - Events are integrated into host state only at the start of the next
//!   host tick, so no bridge structure is ever raced
//! - Channel loss is forwarded once as [`BridgeEvent::ChannelLost`], then
//!   the worker exits

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use synapse_transport::{Channel, Message};

/// How long the worker sleeps when the channel has nothing for it.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How long the worker will wait to enqueue an event before dropping it.
///
/// Bounded so a host that stopped ticking cannot wedge the worker; the
/// worker must stay responsive to the shutdown command.
const EVENT_ENQUEUE_TIMEOUT: Duration = Duration::from_millis(100);

/// Event from the I/O thread to the tick-integration point.
#[derive(Clone, Debug)]
pub enum BridgeEvent {
    /// A decoded message from the external engine.
    Message(Message),
    /// The channel is gone. Fatal to the instance; sent at most once.
    ChannelLost(String),
}

/// Command from the tick-integration point to the I/O thread.
#[derive(Clone, Debug)]
pub enum BridgeCommand {
    /// Send a message to the external engine.
    Send(Message),
    /// Exit the worker loop.
    Shutdown,
}

/// Handle to a running receive worker.
pub struct WorkerHandle {
    events: Receiver<BridgeEvent>,
    commands: Sender<BridgeCommand>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawns the worker thread around an established channel.
    #[must_use]
    pub fn spawn(channel: Box<dyn Channel>, event_capacity: usize) -> Self {
        let (event_tx, event_rx) = bounded(event_capacity);
        let (command_tx, command_rx) = bounded(event_capacity);

        let join = std::thread::Builder::new()
            .name("synapse-io".to_string())
            .spawn(move || run(channel, &event_tx, &command_rx))
            .ok();

        Self {
            events: event_rx,
            commands: command_tx,
            join,
        }
    }

    /// Queues a message for sending.
    ///
    /// Returns false if the worker is gone or its queue is full.
    pub fn send(&self, message: Message) -> bool {
        self.commands.try_send(BridgeCommand::Send(message)).is_ok()
    }

    /// Drains every event currently queued.
    pub fn drain_events(&self, out: &mut Vec<BridgeEvent>) {
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
    }

    /// Stops the worker and waits for it to exit.
    pub fn shutdown(mut self) {
        let _ = self.commands.try_send(BridgeCommand::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        // Best effort; an already-exited worker ignores this.
        let _ = self.commands.try_send(BridgeCommand::Shutdown);
    }
}

/// Worker loop: drain commands, poll the channel, forward events.
fn run(
    mut channel: Box<dyn Channel>,
    event_tx: &Sender<BridgeEvent>,
    command_rx: &Receiver<BridgeCommand>,
) {
    let mut inbox = Vec::new();
    loop {
        // 1. Commands first, so teardown messages leave before we block.
        loop {
            match command_rx.try_recv() {
                Ok(BridgeCommand::Send(message)) => {
                    if let Err(e) = channel.send(&message) {
                        report_loss(event_tx, &e.to_string());
                        return;
                    }
                }
                Ok(BridgeCommand::Shutdown) | Err(TryRecvError::Disconnected) => return,
                Err(TryRecvError::Empty) => break,
            }
        }

        // 2. Drain the channel.
        match channel.poll(&mut inbox) {
            Ok(_) => {
                for message in inbox.drain(..) {
                    let event = BridgeEvent::Message(message);
                    if event_tx.send_timeout(event, EVENT_ENQUEUE_TIMEOUT).is_err() {
                        tracing::warn!("event queue saturated, dropping engine message");
                    }
                }
            }
            Err(e) => {
                report_loss(event_tx, &e.to_string());
                return;
            }
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

fn report_loss(event_tx: &Sender<BridgeEvent>, reason: &str) {
    tracing::error!("transport channel lost: {reason}");
    let _ = event_tx.send_timeout(
        BridgeEvent::ChannelLost(reason.to_string()),
        EVENT_ENQUEUE_TIMEOUT,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_transport::LoopbackChannel;

    #[test]
    fn test_worker_forwards_messages() {
        let (near, mut far) = LoopbackChannel::pair();
        let worker = WorkerHandle::spawn(Box::new(near), 64);

        far.send(&Message::CancelFrame { sequence: 4 }).unwrap();

        let mut events = Vec::new();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while events.is_empty() {
            assert!(std::time::Instant::now() < deadline, "event deadline");
            worker.drain_events(&mut events);
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(matches!(
            &events[0],
            BridgeEvent::Message(Message::CancelFrame { sequence: 4 })
        ));

        worker.shutdown();
    }

    #[test]
    fn test_worker_sends_commands() {
        let (near, mut far) = LoopbackChannel::pair();
        let worker = WorkerHandle::spawn(Box::new(near), 64);

        assert!(worker.send(Message::Teardown));

        let mut out = Vec::new();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while out.is_empty() {
            assert!(std::time::Instant::now() < deadline, "send deadline");
            far.poll(&mut out).unwrap();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(out[0], Message::Teardown);

        worker.shutdown();
    }

    #[test]
    fn test_worker_reports_channel_loss_once() {
        let (near, far) = LoopbackChannel::pair();
        let worker = WorkerHandle::spawn(Box::new(near), 64);
        drop(far);

        let mut events = Vec::new();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while events.is_empty() {
            assert!(std::time::Instant::now() < deadline, "loss deadline");
            worker.drain_events(&mut events);
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(matches!(&events[0], BridgeEvent::ChannelLost(_)));

        // The worker has exited; no further events ever arrive.
        std::thread::sleep(Duration::from_millis(10));
        let mut later = Vec::new();
        worker.drain_events(&mut later);
        assert!(later.is_empty());

        worker.shutdown();
    }
}
