//! Display sync adapter
//!
//! A thin client that mirrors the engine's state. The engine is the source
//! of truth; the adapter only counts down on its own while it cannot reach
//! the engine, and says so in every frame it renders.

pub mod surface;
pub mod transport;
pub mod watch;

use tracing::{debug, info, warn};

use crate::{
    protocol::{Command, CommandResponse, EngineEvent},
    state::{SessionDurations, SessionType, TimerState},
};

pub use surface::{DisplayFrame, DisplaySurface, SyncMode, TerminalSurface};
pub use transport::{EngineTransport, HttpTransport};

pub struct DisplayAdapter<T, S> {
    transport: T,
    surface: S,
    durations: SessionDurations,
    state: TimerState,
    mode: SyncMode,
}

impl<T: EngineTransport, S: DisplaySurface> DisplayAdapter<T, S> {
    /// `durations` seed the default state and drive local fallback
    /// transitions; they should match the daemon's configuration.
    pub fn new(transport: T, surface: S, durations: SessionDurations) -> Self {
        Self::with_seed(transport, surface, durations, TimerState::initial(&durations))
    }

    /// Start from a known state, shown in fallback mode until `attach`
    /// reaches the engine.
    pub fn with_seed(
        transport: T,
        surface: S,
        durations: SessionDurations,
        seed: TimerState,
    ) -> Self {
        Self {
            transport,
            surface,
            durations,
            state: seed,
            mode: SyncMode::Fallback,
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Last state this adapter knows, authoritative or not
    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Ask the engine for its state. Falls back to the last known state
    /// when the engine does not answer.
    pub async fn attach(&mut self) -> SyncMode {
        match self.transport.request(Command::GetState).await {
            Ok(response) => {
                info!("Attached to engine");
                self.mode = SyncMode::Authoritative;
                self.state = response.state().clone();
            }
            Err(e) => {
                warn!("Engine unreachable on attach, counting down locally: {}", e);
                self.mode = SyncMode::Fallback;
            }
        }
        self.render();
        self.mode
    }

    /// Stop mirroring after the event stream went away
    pub fn detach(&mut self) {
        if self.mode == SyncMode::Authoritative {
            info!("Detached from engine, counting down locally");
            self.mode = SyncMode::Fallback;
            self.render();
        }
    }

    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::StateUpdated { state } => self.on_engine_update(state),
            EngineEvent::SessionComplete { ended_session } => {
                self.on_session_complete(ended_session)
            }
        }
    }

    pub fn on_engine_update(&mut self, state: TimerState) {
        if self.mode != SyncMode::Authoritative {
            debug!("Ignoring engine update while in fallback mode");
            return;
        }
        self.state = state;
        self.render();
    }

    /// Play the local cue; the new session arrives in the next update
    pub fn on_session_complete(&mut self, ended: SessionType) {
        if self.mode != SyncMode::Authoritative {
            return;
        }
        self.surface.completion_cue(ended);
    }

    pub async fn start(&mut self) {
        self.forward(Command::Start).await;
    }

    pub async fn pause(&mut self) {
        self.forward(Command::Pause).await;
    }

    pub async fn reset(&mut self) {
        self.forward(Command::Reset).await;
    }

    pub async fn switch_session(&mut self, target: SessionType) {
        self.forward(Command::SwitchSession { target }).await;
    }

    /// One second of the local shadow countdown. Only moves in fallback mode.
    pub fn local_tick(&mut self) {
        if self.mode != SyncMode::Fallback || !self.state.running {
            return;
        }

        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds == 0 {
            let ended = self.state.advance(&self.durations);
            self.surface.completion_cue(ended);
        }
        self.render();
    }

    async fn forward(&mut self, command: Command) {
        if self.mode == SyncMode::Authoritative {
            match self.transport.request(command.clone()).await {
                Ok(response) => {
                    if let CommandResponse::Rejected { reason, .. } = &response {
                        self.surface.notice(reason);
                    }
                    self.state = response.state().clone();
                    self.render();
                    return;
                }
                Err(e) => {
                    // No further delegation until the next attach
                    warn!("{} not delivered, switching to local mode: {}", command.name(), e);
                    self.mode = SyncMode::Fallback;
                }
            }
        }

        self.apply_locally(command);
        self.render();
    }

    fn apply_locally(&mut self, command: Command) {
        match command {
            Command::Start => self.state.running = true,
            Command::Pause => self.state.running = false,
            Command::Reset => {
                self.state.running = false;
                let session = self.state.session;
                self.state.begin(session, &self.durations);
            }
            Command::SwitchSession { target } => {
                if self.state.running {
                    self.surface
                        .notice("Pause the timer before switching sessions");
                } else {
                    self.state.begin(target, &self.durations);
                }
            }
            Command::GetState => {}
        }
    }

    fn render(&mut self) {
        let frame = DisplayFrame::new(&self.state, self.mode);
        self.surface.render(&frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, TomatoError};
    use async_trait::async_trait;
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    };

    /// Engine stand-in that answers from a fixed state until told to fail
    #[derive(Clone)]
    struct FakeTransport {
        state: Arc<Mutex<TimerState>>,
        offline: Arc<AtomicBool>,
        requests: Arc<AtomicUsize>,
    }

    impl FakeTransport {
        fn online(state: TimerState) -> Self {
            Self {
                state: Arc::new(Mutex::new(state)),
                offline: Arc::new(AtomicBool::new(false)),
                requests: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn go_offline(&self) {
            self.offline.store(true, Ordering::SeqCst);
        }

        fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EngineTransport for FakeTransport {
        async fn request(&self, command: Command) -> Result<CommandResponse> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(TomatoError::Delivery("connection refused".to_string()));
            }
            let mut state = self.state.lock().unwrap();
            Ok(match command {
                Command::GetState => CommandResponse::State {
                    state: state.clone(),
                },
                Command::Start => {
                    state.running = true;
                    CommandResponse::Ack {
                        state: state.clone(),
                    }
                }
                Command::SwitchSession { .. } if state.running => CommandResponse::Rejected {
                    reason: "running".to_string(),
                    state: state.clone(),
                },
                _ => CommandResponse::Ack {
                    state: state.clone(),
                },
            })
        }
    }

    #[derive(Default)]
    struct RecordingSurface {
        frames: Vec<DisplayFrame>,
        cues: Vec<SessionType>,
        notices: Vec<String>,
    }

    impl DisplaySurface for RecordingSurface {
        fn render(&mut self, frame: &DisplayFrame) {
            self.frames.push(frame.clone());
        }

        fn completion_cue(&mut self, ended: SessionType) {
            self.cues.push(ended);
        }

        fn notice(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }
    }

    fn engine_state(remaining: u64, running: bool) -> TimerState {
        let mut state = TimerState::initial(&SessionDurations::default());
        state.remaining_seconds = remaining;
        state.running = running;
        state
    }

    fn adapter(
        transport: FakeTransport,
    ) -> DisplayAdapter<FakeTransport, RecordingSurface> {
        DisplayAdapter::new(
            transport,
            RecordingSurface::default(),
            SessionDurations::default(),
        )
    }

    #[tokio::test]
    async fn attach_mirrors_engine_state() {
        let mut adapter = adapter(FakeTransport::online(engine_state(600, true)));

        assert_eq!(adapter.attach().await, SyncMode::Authoritative);

        let frame = adapter.surface().frames.last().unwrap();
        assert_eq!(frame.clock, "10:00");
        assert!(frame.running);
        assert_eq!(frame.mode, SyncMode::Authoritative);
    }

    #[tokio::test]
    async fn attach_without_engine_uses_default_in_fallback() {
        let transport = FakeTransport::online(engine_state(600, true));
        transport.go_offline();
        let mut adapter = adapter(transport);

        assert_eq!(adapter.attach().await, SyncMode::Fallback);

        let frame = adapter.surface().frames.last().unwrap();
        assert_eq!(frame.clock, "25:00");
        assert_eq!(frame.mode, SyncMode::Fallback);
    }

    #[tokio::test]
    async fn attach_without_engine_keeps_seeded_state() {
        let transport = FakeTransport::online(engine_state(600, true));
        transport.go_offline();
        let mut seed = TimerState::fresh(SessionType::LongBreak, &SessionDurations::default());
        seed.remaining_seconds = 90;
        seed.running = true;
        let mut adapter = DisplayAdapter::with_seed(
            transport,
            RecordingSurface::default(),
            SessionDurations::default(),
            seed,
        );

        assert_eq!(adapter.attach().await, SyncMode::Fallback);
        adapter.local_tick();

        let frame = adapter.surface().frames.last().unwrap();
        assert_eq!(frame.clock, "01:29");
        assert!(frame.running);
        assert_eq!(frame.mode, SyncMode::Fallback);
        assert_eq!(adapter.state().session, SessionType::LongBreak);
    }

    #[tokio::test]
    async fn local_ticks_only_move_in_fallback() {
        let transport = FakeTransport::online(engine_state(600, true));
        let mut adapter = adapter(transport.clone());
        adapter.attach().await;

        adapter.local_tick();
        assert_eq!(adapter.state().remaining_seconds, 600);

        adapter.detach();
        adapter.local_tick();
        assert_eq!(adapter.state().remaining_seconds, 599);
        assert_eq!(adapter.surface().frames.last().unwrap().mode, SyncMode::Fallback);
    }

    #[tokio::test]
    async fn delivery_failure_stops_delegation_until_reattach() {
        let transport = FakeTransport::online(engine_state(1500, false));
        let mut adapter = adapter(transport.clone());
        adapter.attach().await;
        transport.go_offline();

        adapter.start().await;
        let after_failure = transport.requests();
        assert_eq!(adapter.mode(), SyncMode::Fallback);
        assert!(adapter.state().running);

        adapter.pause().await;
        adapter.reset().await;
        assert_eq!(transport.requests(), after_failure);
        assert!(!adapter.state().running);
    }

    #[tokio::test]
    async fn updates_in_fallback_are_not_presented_as_live() {
        let transport = FakeTransport::online(engine_state(1500, false));
        transport.go_offline();
        let mut adapter = adapter(transport);
        adapter.attach().await;

        adapter.on_engine_update(engine_state(42, true));

        assert_eq!(adapter.state().remaining_seconds, 1500);
    }

    #[tokio::test]
    async fn rejected_switch_shows_notice_and_keeps_session() {
        let transport = FakeTransport::online(engine_state(100, true));
        let mut adapter = adapter(transport);
        adapter.attach().await;

        adapter.switch_session(SessionType::LongBreak).await;

        assert_eq!(adapter.surface().notices, vec!["running".to_string()]);
        assert_eq!(adapter.state().session, SessionType::Work);
    }

    #[tokio::test]
    async fn fallback_countdown_advances_session_at_zero() {
        let transport = FakeTransport::online(engine_state(2, true));
        let mut adapter = adapter(transport);
        adapter.attach().await;
        adapter.detach();

        adapter.local_tick();
        adapter.local_tick();

        assert_eq!(adapter.surface().cues, vec![SessionType::Work]);
        assert_eq!(adapter.state().session, SessionType::ShortBreak);
        assert_eq!(adapter.state().remaining_seconds, 300);
        assert!(!adapter.state().running);
    }

    #[tokio::test]
    async fn session_complete_event_plays_cue() {
        let mut adapter = adapter(FakeTransport::online(engine_state(1, true)));
        adapter.attach().await;

        adapter.handle_event(EngineEvent::SessionComplete {
            ended_session: SessionType::Work,
        });
        adapter.handle_event(EngineEvent::StateUpdated {
            state: TimerState::fresh(SessionType::ShortBreak, &SessionDurations::default()),
        });

        assert_eq!(adapter.surface().cues, vec![SessionType::Work]);
        assert_eq!(adapter.surface().frames.last().unwrap().clock, "05:00");
    }
}
