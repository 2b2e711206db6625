//! Tomato Daemon - a crash-tolerant Pomodoro session daemon
//!
//! Runs the session engine and HTTP API, or acts as a display client for a
//! running daemon.

use std::sync::Arc;

use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{error, info, warn};

use tomato_daemon::{
    adapter::{watch, HttpTransport},
    api::create_router,
    config::{Config, Mode},
    engine::{Clock, EngineParts, SystemClock, TokioScheduler},
    protocol::Command,
    state::AppState,
    store::{BackgroundStore, JsonFileStore, MemoryStore, StateStore},
    tasks::spawn_engine,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tomato_daemon={},tower_http=info",
            config.log_level()
        ))
        .with_writer(std::io::stderr)
        .init();

    let command = match config.command.clone().unwrap_or(Mode::Serve) {
        Mode::Serve => return serve(config).await,
        Mode::Watch => {
            let transport = HttpTransport::new(config.base_url())?;
            let durations = config.durations();
            let seed = if config.ephemeral {
                None
            } else {
                let now = SystemClock.now_epoch_ms();
                config
                    .state_file()
                    .ok()
                    .and_then(|path| watch::last_record(&path, &durations, now))
            };
            watch::watch(transport, durations, seed).await?;
            // stdin reader would otherwise hold the runtime open
            std::process::exit(0);
        }
        Mode::Status => Command::GetState,
        Mode::Start => Command::Start,
        Mode::Pause => Command::Pause,
        Mode::Reset => Command::Reset,
        Mode::Switch { target } => Command::SwitchSession { target },
    };

    let transport = HttpTransport::new(config.base_url())?;
    let response = watch::run_command(&transport, command).await?;
    if response.is_rejected() {
        std::process::exit(2);
    }
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Starting tomato-daemon v{}", env!("CARGO_PKG_VERSION"));
    let durations = config.durations();
    info!(
        "Configuration: host={}, port={}, work={}s, short={}s, long={}s",
        config.host, config.port, durations.work, durations.short_break, durations.long_break
    );

    let (store, writer): (Box<dyn StateStore>, Option<JoinHandle<()>>) = if config.ephemeral {
        warn!("Ephemeral mode: timer state will not survive a restart");
        (Box::new(MemoryStore::new()), None)
    } else {
        let path = config.state_file()?;
        info!("State record: {}", path.display());
        let (store, writer) = BackgroundStore::spawn(JsonFileStore::new(path));
        (Box::new(store), Some(writer))
    };

    let parts = EngineParts {
        scheduler: Box::new(TokioScheduler),
        store,
        notifier: config.notifier.build(),
        clock: Box::new(SystemClock),
    };
    let (engine, engine_task) = spawn_engine(config.engine_settings(), parts);

    let state = Arc::new(AppState::new(engine.clone(), config.port, config.host.clone()));
    let app = create_router(state);

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /command         - START | PAUSE | RESET | SWITCH_SESSION | GET_STATE");
    info!("  POST /start|/pause|/reset");
    info!("  POST /switch/:target  - work | shortBreak | longBreak");
    info!("  GET  /state           - Current timer state");
    info!("  GET  /events          - Server-sent broadcast stream");
    info!("  GET  /health          - Health check");

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    if let Err(e) = engine.shutdown().await {
        warn!("Engine did not shut down cleanly: {}", e);
    }
    if let Err(e) = engine_task.await {
        warn!("Engine task failed: {}", e);
    }
    if let Some(writer) = writer {
        if let Err(e) = writer.await {
            warn!("State writer failed: {}", e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
