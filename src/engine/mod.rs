//! Session engine module
//!
//! The engine owns the canonical timer state. It is driven by a single task
//! (see [`crate::tasks::engine_loop`]) so every command and tick is applied
//! one at a time in arrival order.

pub mod core;
pub mod scheduler;

pub use self::core::{
    EngineParts, EngineSettings, Recovery, SessionEngine, TickSink, TICK_INTERVAL,
};
pub use scheduler::{CancelHandle, Clock, Scheduler, SystemClock, TickCallback, TokioScheduler};
