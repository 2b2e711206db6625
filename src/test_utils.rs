//! Fake collaborators shared by unit tests

use std::{
    sync::{
        atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use tokio::sync::broadcast;

use crate::{
    engine::{
        CancelHandle, Clock, EngineParts, EngineSettings, Scheduler, SessionEngine, TickCallback,
    },
    error::{Result, TomatoError},
    protocol::EngineEvent,
    services::Notifier,
    state::{SessionDurations, TimerState},
    store::{MemoryStore, StateStore},
};

/// Scheduler that never fires on its own; tests call `tick()` directly
#[derive(Debug, Clone, Default)]
pub struct FakeScheduler {
    activations: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
}

impl FakeScheduler {
    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Scheduler for FakeScheduler {
    fn schedule_repeating(
        &self,
        _interval: Duration,
        _callback: TickCallback,
    ) -> Box<dyn CancelHandle> {
        self.activations.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeCancel {
            active: Arc::clone(&self.active),
            cancelled: AtomicBool::new(false),
        })
    }
}

struct FakeCancel {
    active: Arc<AtomicUsize>,
    cancelled: AtomicBool,
}

impl CancelHandle for FakeCancel {
    fn cancel(&mut self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeClock(Arc<AtomicI64>);

impl FakeClock {
    pub fn set(&self, epoch_ms: i64) {
        self.0.store(epoch_ms, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_epoch_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier(Arc<Mutex<Vec<String>>>);

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.messages().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, _body: &str) -> Result<()> {
        self.0.lock().unwrap().push(title.to_string());
        Ok(())
    }
}

pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _title: &str, _body: &str) -> Result<()> {
        Err(TomatoError::Notify("notifier offline".to_string()))
    }
}

pub struct FailingStore;

impl StateStore for FailingStore {
    fn load(&self) -> Result<Option<TimerState>> {
        Err(TomatoError::Io {
            context: "disk unplugged".to_string(),
            source: std::io::Error::other("eio"),
        })
    }

    fn save(&self, _state: &TimerState) -> Result<()> {
        Err(TomatoError::Io {
            context: "disk unplugged".to_string(),
            source: std::io::Error::other("eio"),
        })
    }
}

/// Memory store that counts writes
#[derive(Debug, Clone, Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    saves: Arc<AtomicUsize>,
}

impl StateStore for CountingStore {
    fn load(&self) -> Result<Option<TimerState>> {
        self.inner.load()
    }

    fn save(&self, state: &TimerState) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(state)
    }
}

/// An engine wired to fakes, with handles to inspect each of them
pub struct Harness {
    pub engine: SessionEngine,
    pub store: MemoryStore,
    pub notifier: RecordingNotifier,
    pub clock: FakeClock,
    pub scheduler: FakeScheduler,
    pub events: broadcast::Sender<EngineEvent>,
    saves: Arc<AtomicUsize>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(SessionDurations::default(), MemoryStore::new(), None, None)
    }

    pub fn with_durations(durations: SessionDurations) -> Self {
        Self::build(durations, MemoryStore::new(), None, None)
    }

    pub fn with_record(record: TimerState) -> Self {
        Self::build(
            SessionDurations::default(),
            MemoryStore::with_record(record),
            None,
            None,
        )
    }

    pub fn with_parts(store: Box<dyn StateStore>, notifier: Box<dyn Notifier>) -> Self {
        Self::build(
            SessionDurations::default(),
            MemoryStore::new(),
            Some(store),
            Some(notifier),
        )
    }

    fn build(
        durations: SessionDurations,
        memory: MemoryStore,
        store: Option<Box<dyn StateStore>>,
        notifier: Option<Box<dyn Notifier>>,
    ) -> Self {
        let counting = CountingStore {
            inner: memory.clone(),
            saves: Arc::new(AtomicUsize::new(0)),
        };
        let saves = Arc::clone(&counting.saves);
        let recorder = RecordingNotifier::default();
        let clock = FakeClock::default();
        let scheduler = FakeScheduler::default();
        let (events, _) = broadcast::channel(64);

        let parts = EngineParts {
            scheduler: Box::new(scheduler.clone()),
            store: store.unwrap_or_else(|| Box::new(counting)),
            notifier: notifier.unwrap_or_else(|| Box::new(recorder.clone())),
            clock: Box::new(clock.clone()),
        };
        let settings = EngineSettings {
            durations,
            persist_every_ticks: 10,
        };
        let engine = SessionEngine::new(settings, parts, events.clone(), Arc::new(|_| {}));

        Self {
            engine,
            store: memory,
            notifier: recorder,
            clock,
            scheduler,
            events,
            saves,
        }
    }

    pub fn store_saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}
