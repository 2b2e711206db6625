//! Tomato Daemon - a crash-tolerant Pomodoro session engine
//!
//! The engine owns the canonical countdown, persists it after every
//! meaningful change and recovers elapsed wall-clock time after a restart.
//! Display clients attach over HTTP, mirror the engine's broadcasts and fall
//! back to a clearly marked local countdown when the engine is unreachable.

pub mod adapter;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod services;
pub mod state;
pub mod store;
pub mod tasks;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use engine::SessionEngine;
pub use error::TomatoError;
pub use state::{AppState, SessionType, TimerState};
pub use utils::signals::shutdown_signal;
