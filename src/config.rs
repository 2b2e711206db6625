//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{
    engine::EngineSettings,
    error::{Result, TomatoError},
    services::NotifierKind,
    state::{SessionDurations, SessionType},
};

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "tomato-daemon")]
#[command(about = "A crash-tolerant Pomodoro session daemon and terminal display")]
#[command(version)]
pub struct Config {
    #[command(subcommand)]
    pub command: Option<Mode>,

    /// Port the daemon listens on
    #[arg(short, long, global = true, env = "TOMATO_PORT", default_value = "20554")]
    pub port: u16,

    /// Host address the daemon binds to
    #[arg(long, global = true, env = "TOMATO_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Work session length in seconds
    #[arg(long, global = true, env = "TOMATO_WORK_SECS", default_value = "1500",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub work_secs: u64,

    /// Short break length in seconds
    #[arg(long, global = true, env = "TOMATO_SHORT_BREAK_SECS", default_value = "300",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub short_break_secs: u64,

    /// Long break length in seconds
    #[arg(long, global = true, env = "TOMATO_LONG_BREAK_SECS", default_value = "900",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub long_break_secs: u64,

    /// Persist the running countdown every N ticks
    #[arg(long, global = true, env = "TOMATO_PERSIST_EVERY", default_value = "10",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub persist_every: u32,

    /// Location of the durable state record
    #[arg(long, global = true, env = "TOMATO_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Keep state in memory only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// How completed sessions are announced
    #[arg(long, global = true, value_enum, env = "TOMATO_NOTIFIER", default_value = "log")]
    pub notifier: NotifierKind,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// What this invocation does
#[derive(Debug, Clone, Subcommand)]
pub enum Mode {
    /// Run the session engine and HTTP API (default)
    Serve,
    /// Live display that follows the daemon
    Watch,
    /// Print the current state
    Status,
    /// Start the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Refill the current session
    Reset,
    /// Change session type while stopped
    Switch {
        #[arg(value_enum)]
        target: SessionType,
    },
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL clients use to reach the daemon
    pub fn base_url(&self) -> String {
        let host = if self.host == "0.0.0.0" {
            "127.0.0.1"
        } else {
            self.host.as_str()
        };
        format!("http://{}:{}", host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    pub fn durations(&self) -> SessionDurations {
        SessionDurations::new(self.work_secs, self.short_break_secs, self.long_break_secs)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            durations: self.durations(),
            persist_every_ticks: self.persist_every,
        }
    }

    /// Explicit `--state-file`, else the platform data directory
    pub fn state_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.state_file {
            return Ok(path.clone());
        }
        dirs::data_local_dir()
            .map(|dir| dir.join("tomato-daemon").join("state.json"))
            .ok_or_else(|| {
                TomatoError::Config(
                    "no local data directory found, pass --state-file".to_string(),
                )
            })
    }
}
