//! Shared state handed to every HTTP handler

use std::{sync::Mutex, time::Instant};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::{
    error::Result,
    protocol::{Command, CommandResponse, EngineEvent},
    tasks::EngineHandle,
};

/// Server-side state: the engine handle plus server metadata
#[derive(Debug)]
pub struct AppState {
    engine: EngineHandle,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last command tracking
    last_command: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl AppState {
    pub fn new(engine: EngineHandle, port: u16, host: String) -> Self {
        Self {
            engine,
            start_time: Instant::now(),
            port,
            host,
            last_command: Mutex::new(None),
        }
    }

    /// Forward a command to the engine and remember it
    pub async fn dispatch(&self, command: Command) -> Result<CommandResponse> {
        if !matches!(command, Command::GetState) {
            if let Ok(mut last) = self.last_command.lock() {
                *last = Some((command.name().to_string(), Utc::now()));
            }
        }
        self.engine.send(command).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.engine.subscribe()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    pub fn get_last_command(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        match self.last_command.lock().ok().and_then(|last| last.clone()) {
            Some((name, at)) => (Some(name), Some(at)),
            None => (None, None),
        }
    }
}
