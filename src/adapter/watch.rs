//! Terminal client entry points

use std::{path::Path, time::Duration};

use tokio::{
    io::{stdin, AsyncBufReadExt, BufReader},
    sync::mpsc,
    task::JoinHandle,
    time::interval,
};
use tracing::{debug, info};

use super::{
    DisplayAdapter, DisplaySurface, EngineTransport, HttpTransport, SyncMode, TerminalSurface,
};
use crate::{
    error::Result,
    protocol::{Command, CommandResponse, EngineEvent},
    state::{SessionDurations, SessionType, TimerState},
    store::{JsonFileStore, StateStore},
    utils::{format_mmss, shutdown_signal},
};

/// How often a detached display tries to reach the engine again
const REATTACH_INTERVAL: Duration = Duration::from_secs(5);

/// Keys accepted by the live display, one per line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Start,
    Pause,
    Reset,
    Switch(SessionType),
    Quit,
}

impl Gesture {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "s" | "start" => Some(Gesture::Start),
            "p" | "pause" => Some(Gesture::Pause),
            "r" | "reset" => Some(Gesture::Reset),
            "w" | "work" => Some(Gesture::Switch(SessionType::Work)),
            "b" | "short" => Some(Gesture::Switch(SessionType::ShortBreak)),
            "l" | "long" => Some(Gesture::Switch(SessionType::LongBreak)),
            "q" | "quit" => Some(Gesture::Quit),
            _ => None,
        }
    }

    pub async fn apply<T: EngineTransport, S: DisplaySurface>(
        self,
        adapter: &mut DisplayAdapter<T, S>,
    ) {
        match self {
            Gesture::Start => adapter.start().await,
            Gesture::Pause => adapter.pause().await,
            Gesture::Reset => adapter.reset().await,
            Gesture::Switch(target) => adapter.switch_session(target).await,
            Gesture::Quit => {}
        }
    }
}

/// Send one command and print the engine's answer
pub async fn run_command(transport: &HttpTransport, command: Command) -> Result<CommandResponse> {
    let response = transport.request(command).await?;
    let state = response.state();
    let verdict = match &response {
        CommandResponse::Rejected { reason, .. } => format!("rejected: {}", reason),
        CommandResponse::Ack { .. } => "ok".to_string(),
        CommandResponse::State { .. } => "state".to_string(),
    };
    println!(
        "{} | {} {} {} cycle {}",
        verdict,
        state.session,
        format_mmss(state.remaining_seconds),
        if state.running { "running" } else { "paused" },
        state.cycle_count
    );
    Ok(response)
}

/// The durable record at `path`, brought forward to `now_epoch_ms`.
/// Used to seed the display when the engine cannot be reached.
pub fn last_record(
    path: &Path,
    durations: &SessionDurations,
    now_epoch_ms: i64,
) -> Option<TimerState> {
    match JsonFileStore::new(path).load() {
        Ok(record) => record.map(|r| r.clamped(durations).caught_up(now_epoch_ms, durations)),
        Err(e) => {
            debug!("No usable state record for the display: {}", e);
            None
        }
    }
}

/// The event stream task currently feeding the display
#[derive(Debug, Default)]
struct Subscription(Option<JoinHandle<()>>);

impl Subscription {
    fn replace(&mut self, handle: JoinHandle<()>) {
        self.cancel();
        self.0 = Some(handle);
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }

    fn has_ended(&self) -> bool {
        self.0.as_ref().is_some_and(|handle| handle.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Live display: mirror the engine until Ctrl-C, counting down locally
/// whenever the engine is unreachable.
pub async fn watch(
    transport: HttpTransport,
    durations: SessionDurations,
    seed: Option<TimerState>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let seed = seed.unwrap_or_else(|| TimerState::initial(&durations));
    let mut adapter =
        DisplayAdapter::with_seed(transport.clone(), TerminalSurface::default(), durations, seed);
    let mut stream = Subscription::default();

    // Subscribe before asking for state so no update falls in between
    let first = subscribe(&transport, tx.clone());
    if adapter.attach().await == SyncMode::Authoritative {
        stream.replace(first);
    } else {
        first.abort();
    }

    let mut keys = BufReader::new(stdin()).lines();
    let mut keys_open = true;

    let mut ticker = interval(Duration::from_secs(1));
    let mut reattach = interval(REATTACH_INTERVAL);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = rx.recv() => adapter.handle_event(event),
            line = keys.next_line(), if keys_open => match line {
                Ok(Some(line)) => match Gesture::parse(&line) {
                    Some(Gesture::Quit) => break,
                    Some(gesture) => {
                        gesture.apply(&mut adapter).await;
                        // A failed delivery drops the adapter to local mode
                        if adapter.mode() == SyncMode::Fallback {
                            stream.cancel();
                        }
                    }
                    None => debug!("Unknown key {:?}", line.trim()),
                },
                _ => keys_open = false,
            },
            _ = ticker.tick() => {
                if stream.has_ended() {
                    stream.cancel();
                    adapter.detach();
                }
                adapter.local_tick();
            }
            _ = reattach.tick(), if adapter.mode() == SyncMode::Fallback => {
                debug!("Trying to reattach to {}", transport.base_url());
                stream.cancel();
                let handle = subscribe(&transport, tx.clone());
                if adapter.attach().await == SyncMode::Authoritative {
                    stream.replace(handle);
                } else {
                    handle.abort();
                }
            }
            _ = &mut shutdown => break,
        }
    }

    stream.cancel();
    println!();
    info!("Display closed");
    Ok(())
}

fn subscribe(transport: &HttpTransport, tx: mpsc::UnboundedSender<EngineEvent>) -> JoinHandle<()> {
    let transport = transport.clone();
    tokio::spawn(async move {
        if let Err(e) = transport.stream_events(tx).await {
            debug!("Event stream ended: {}", e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    /// A stream task that never ends on its own; `rx` errors once it is gone
    fn idle_stream() -> (JoinHandle<()>, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _alive = tx;
            pending::<()>().await
        });
        (handle, rx)
    }

    #[tokio::test]
    async fn replacing_a_subscription_stops_the_previous_stream() {
        let (first, first_gone) = idle_stream();
        let (second, mut second_gone) = idle_stream();
        let mut stream = Subscription::default();

        stream.replace(first);
        stream.replace(second);

        assert!(first_gone.await.is_err());
        tokio::task::yield_now().await;
        assert_eq!(
            second_gone.try_recv(),
            Err(oneshot::error::TryRecvError::Empty)
        );
        assert!(stream.0.is_some());
        assert!(!stream.has_ended());
    }

    #[tokio::test]
    async fn cancelled_subscription_stops_its_stream() {
        let (handle, gone) = idle_stream();
        let mut stream = Subscription::default();
        stream.replace(handle);

        stream.cancel();

        assert!(gone.await.is_err());
        assert!(stream.0.is_none());
    }

    #[test]
    fn last_record_is_brought_forward() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let durations = SessionDurations::default();
        let mut record = TimerState::initial(&durations);
        record.remaining_seconds = 600;
        record.running = true;
        record.last_persisted_at_epoch_ms = 1_000;
        JsonFileStore::new(&path).save(&record).unwrap();

        let seed = last_record(&path, &durations, 101_000).unwrap();

        assert_eq!(seed.remaining_seconds, 500);
        assert!(seed.running);
    }

    #[test]
    fn missing_or_corrupt_record_gives_no_seed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let durations = SessionDurations::default();

        assert!(last_record(&path, &durations, 0).is_none());

        std::fs::write(&path, "not json").unwrap();
        assert!(last_record(&path, &durations, 0).is_none());
    }

    #[test]
    fn gestures_parse_short_and_long_forms() {
        assert_eq!(Gesture::parse("s\n"), Some(Gesture::Start));
        assert_eq!(Gesture::parse(" pause "), Some(Gesture::Pause));
        assert_eq!(
            Gesture::parse("b"),
            Some(Gesture::Switch(SessionType::ShortBreak))
        );
        assert_eq!(Gesture::parse("q"), Some(Gesture::Quit));
        assert_eq!(Gesture::parse("x"), None);
    }
}
