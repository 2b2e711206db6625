//! The session engine: sole owner and writer of the timer state

use std::{sync::Arc, time::Duration};

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::scheduler::{CancelHandle, Clock, Scheduler};
use crate::{
    error::{Result, TomatoError},
    protocol::{Command, CommandResponse, EngineEvent},
    services::Notifier,
    state::{SessionDurations, SessionType, TimerState},
    store::StateStore,
};

/// Period of the countdown driver
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Receives the generation number of the driver that fired
pub type TickSink = Arc<dyn Fn(u64) + Send + Sync>;

/// Tunables for a [`SessionEngine`]
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub durations: SessionDurations,
    /// Persist after this many ticks while running
    pub persist_every_ticks: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            durations: SessionDurations::default(),
            persist_every_ticks: 10,
        }
    }
}

/// External collaborators injected into the engine
pub struct EngineParts {
    pub scheduler: Box<dyn Scheduler>,
    pub store: Box<dyn StateStore>,
    pub notifier: Box<dyn Notifier>,
    pub clock: Box<dyn Clock>,
}

/// How [`SessionEngine::recover`] resolved the persisted record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Nothing usable was stored
    Fresh,
    /// Stopped session restored as-is
    Restored,
    /// Running session resumed with elapsed time subtracted
    Resumed { elapsed_seconds: u64 },
    /// The session ran out while the process was down
    CompletedWhileAway { ended: SessionType },
}

pub struct SessionEngine {
    state: TimerState,
    settings: EngineSettings,
    ticks_since_persist: u32,
    driver: Option<Box<dyn CancelHandle>>,
    generation: u64,
    parts: EngineParts,
    events: broadcast::Sender<EngineEvent>,
    tick_sink: TickSink,
}

impl SessionEngine {
    /// Create an engine holding the default state. Call [`recover`] to
    /// pick up a persisted record.
    ///
    /// [`recover`]: SessionEngine::recover
    pub fn new(
        settings: EngineSettings,
        parts: EngineParts,
        events: broadcast::Sender<EngineEvent>,
        tick_sink: TickSink,
    ) -> Self {
        Self {
            state: TimerState::initial(&settings.durations),
            settings,
            ticks_since_persist: 0,
            driver: None,
            generation: 0,
            parts,
            events,
            tick_sink,
        }
    }

    pub fn get_state(&self) -> TimerState {
        self.state.clone()
    }

    pub fn is_driver_active(&self) -> bool {
        self.driver.is_some()
    }

    /// Generation of the active driver, if any
    pub fn driver_generation(&self) -> Option<u64> {
        self.driver.as_ref().map(|_| self.generation)
    }

    /// Rebuild state from the store, accounting for wall-clock time that
    /// passed while no process was running.
    pub fn recover(&mut self) -> Recovery {
        let durations = self.settings.durations;
        let loaded = match self.parts.store.load() {
            Ok(Some(record)) => record.clamped(&durations),
            Ok(None) => {
                info!("No persisted timer state, starting fresh");
                self.state = TimerState::initial(&durations);
                return Recovery::Fresh;
            }
            Err(e) => {
                warn!("Ignoring unreadable timer state: {}", e);
                self.state = TimerState::initial(&durations);
                return Recovery::Fresh;
            }
        };

        self.deactivate_driver();

        if !loaded.running {
            info!(
                "Restored paused {} session with {}s remaining",
                loaded.session, loaded.remaining_seconds
            );
            self.state = loaded;
            return Recovery::Restored;
        }

        let now = self.parts.clock.now_epoch_ms();
        let elapsed = loaded.elapsed_since_persist(now);
        let remaining = loaded.remaining_seconds.saturating_sub(elapsed);
        self.state = TimerState {
            remaining_seconds: remaining,
            running: false,
            ..loaded
        };

        if remaining == 0 {
            info!(
                "{} session ran out {}s ago while the engine was down",
                self.state.session, elapsed
            );
            let ended = self.complete_session();
            return Recovery::CompletedWhileAway { ended };
        }

        info!(
            "Resuming {} session: {}s elapsed while down, {}s remaining",
            self.state.session, elapsed, remaining
        );
        self.state.running = true;
        self.activate_driver();
        self.persist();
        self.broadcast_state();
        Recovery::Resumed {
            elapsed_seconds: elapsed,
        }
    }

    pub fn start(&mut self) -> TimerState {
        if self.state.running {
            debug!("start ignored, already running");
            return self.get_state();
        }

        info!(
            "Starting {} session with {}s remaining",
            self.state.session, self.state.remaining_seconds
        );
        self.state.running = true;
        self.activate_driver();
        self.persist();
        self.broadcast_state();
        self.get_state()
    }

    pub fn pause(&mut self) -> TimerState {
        if !self.state.running {
            debug!("pause ignored, not running");
            return self.get_state();
        }

        info!("Pausing with {}s remaining", self.state.remaining_seconds);
        self.state.running = false;
        self.deactivate_driver();
        self.persist();
        self.broadcast_state();
        self.get_state()
    }

    /// Stop and refill the current session. Session type and cycle count
    /// are kept.
    pub fn reset(&mut self) -> TimerState {
        info!("Resetting {} session", self.state.session);
        self.state.running = false;
        self.deactivate_driver();
        let session = self.state.session;
        self.state.begin(session, &self.settings.durations);
        self.persist();
        self.broadcast_state();
        self.get_state()
    }

    pub fn switch_session(&mut self, target: SessionType) -> Result<TimerState> {
        if self.state.running {
            warn!(
                "Rejected switch to {} while {} is running",
                target, self.state.session
            );
            return Err(TomatoError::SwitchWhileRunning {
                current: self.state.session,
                target,
            });
        }

        info!("Switching to {} session", target);
        self.state.begin(target, &self.settings.durations);
        self.persist();
        self.broadcast_state();
        Ok(self.get_state())
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self) {
        if !self.state.running {
            debug!("tick ignored, not running");
            return;
        }

        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds == 0 {
            self.complete_session();
            return;
        }

        self.ticks_since_persist += 1;
        if self.ticks_since_persist >= self.settings.persist_every_ticks {
            self.persist();
        }
        self.broadcast_state();
    }

    /// Tick delivered by the driver of the given generation. Ticks from a
    /// driver that has since been cancelled are dropped.
    pub fn handle_tick(&mut self, generation: u64) {
        if self.driver_generation() != Some(generation) {
            debug!("Dropping stale tick from driver {}", generation);
            return;
        }
        self.tick();
    }

    /// End the current session and move to the next one. Returns the
    /// session that ended.
    pub fn complete_session(&mut self) -> SessionType {
        self.state.running = false;
        self.deactivate_driver();

        let ended = self.state.session;
        let (title, body) = ended.completion_message();
        if let Err(e) = self.parts.notifier.notify(title, body) {
            warn!("Failed to dispatch notification: {}", e);
        }

        self.state.advance(&self.settings.durations);
        info!(
            "{} session complete, next up {} (cycle {})",
            ended, self.state.session, self.state.cycle_count
        );

        self.persist();
        self.emit(EngineEvent::SessionComplete {
            ended_session: ended,
        });
        self.broadcast_state();
        ended
    }

    /// Execute a protocol command
    pub fn apply(&mut self, command: Command) -> CommandResponse {
        match command {
            Command::Start => CommandResponse::Ack { state: self.start() },
            Command::Pause => CommandResponse::Ack { state: self.pause() },
            Command::Reset => CommandResponse::Ack { state: self.reset() },
            Command::SwitchSession { target } => match self.switch_session(target) {
                Ok(state) => CommandResponse::Ack { state },
                Err(e) => CommandResponse::Rejected {
                    reason: e.to_string(),
                    state: self.get_state(),
                },
            },
            Command::GetState => CommandResponse::State {
                state: self.get_state(),
            },
        }
    }

    /// Write the current snapshot to the store. Failures are logged and the
    /// in-memory state stays authoritative.
    pub fn persist(&mut self) {
        self.state.last_persisted_at_epoch_ms = self.parts.clock.now_epoch_ms();
        self.ticks_since_persist = 0;
        if let Err(e) = self.parts.store.save(&self.state) {
            error!("Failed to persist timer state: {}", e);
        }
    }

    fn activate_driver(&mut self) {
        self.deactivate_driver();
        self.generation += 1;
        self.ticks_since_persist = 0;

        let generation = self.generation;
        let sink = Arc::clone(&self.tick_sink);
        let handle = self
            .parts
            .scheduler
            .schedule_repeating(TICK_INTERVAL, Box::new(move || sink(generation)));
        self.driver = Some(handle);
        debug!("Countdown driver {} active", generation);
    }

    fn deactivate_driver(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.cancel();
            debug!("Countdown driver {} cancelled", self.generation);
        }
    }

    fn broadcast_state(&self) {
        self.emit(EngineEvent::StateUpdated {
            state: self.get_state(),
        });
    }

    fn emit(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            debug!("No display attached, broadcast dropped");
        }
    }
}
