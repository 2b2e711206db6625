//! Background tasks module
//!
//! Long-running tasks spawned next to the HTTP server.

pub mod engine_loop;

pub use engine_loop::{spawn_engine, EngineHandle, EngineMessage};
