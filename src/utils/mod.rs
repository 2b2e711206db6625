//! Utility functions module
//!
//! Signal handling and countdown formatting shared by server and client.

pub mod signals;
pub mod time;

pub use signals::shutdown_signal;
pub use time::format_mmss;
