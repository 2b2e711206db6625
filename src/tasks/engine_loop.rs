//! Engine actor task
//!
//! Commands from HTTP handlers and ticks from the countdown driver share one
//! queue, so the engine processes exactly one event at a time.

use std::sync::Arc;

use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    engine::{EngineParts, EngineSettings, SessionEngine, TickSink},
    error::{Result, TomatoError},
    protocol::{Command, CommandResponse, EngineEvent},
};

const EVENT_CAPACITY: usize = 100;

/// Messages accepted by the engine task
#[derive(Debug)]
pub enum EngineMessage {
    Command {
        command: Command,
        reply: oneshot::Sender<CommandResponse>,
    },
    /// Countdown driver fired; carries the driver generation
    Tick(u64),
    /// Persist the current snapshot and stop processing
    Shutdown { reply: oneshot::Sender<()> },
}

/// Cloneable client side of the engine task
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineMessage>,
    events: broadcast::Sender<EngineEvent>,
}

impl EngineHandle {
    /// Send a command and wait for the engine's reply
    pub async fn send(&self, command: Command) -> Result<CommandResponse> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineMessage::Command { command, reply })
            .map_err(|_| TomatoError::EngineUnavailable("engine task stopped".to_string()))?;
        rx.await
            .map_err(|_| TomatoError::EngineUnavailable("engine dropped the reply".to_string()))
    }

    /// Receive every broadcast emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Flush state and stop the engine task
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineMessage::Shutdown { reply })
            .map_err(|_| TomatoError::EngineUnavailable("engine task stopped".to_string()))?;
        rx.await
            .map_err(|_| TomatoError::EngineUnavailable("engine dropped the reply".to_string()))
    }
}

/// Build the engine, recover persisted state and spawn its task
pub fn spawn_engine(settings: EngineSettings, parts: EngineParts) -> (EngineHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (events, _) = broadcast::channel(EVENT_CAPACITY);

    // The driver only holds a weak sender so it never keeps the queue alive
    let weak = tx.downgrade();
    let tick_sink: TickSink = Arc::new(move |generation| {
        if let Some(tx) = weak.upgrade() {
            let _ = tx.send(EngineMessage::Tick(generation));
        }
    });

    let engine = SessionEngine::new(settings, parts, events.clone(), tick_sink);
    let task = tokio::spawn(engine_task(engine, rx));

    (EngineHandle { tx, events }, task)
}

/// Run recovery, then drain the queue until shutdown or until every handle
/// is dropped.
pub async fn engine_task(mut engine: SessionEngine, mut rx: mpsc::UnboundedReceiver<EngineMessage>) {
    let outcome = engine.recover();
    info!("Session engine ready ({:?})", outcome);

    while let Some(message) = rx.recv().await {
        match message {
            EngineMessage::Command { command, reply } => {
                debug!("Engine received {}", command.name());
                let response = engine.apply(command);
                if reply.send(response).is_err() {
                    warn!("Command sender went away before the reply");
                }
            }
            EngineMessage::Tick(generation) => engine.handle_tick(generation),
            EngineMessage::Shutdown { reply } => {
                info!("Engine shutting down, persisting final snapshot");
                engine.persist();
                let _ = reply.send(());
                break;
            }
        }
    }

    info!("Session engine stopped");
}
