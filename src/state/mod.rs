//! State management module
//!
//! Session types, the canonical timer state and the server-side shared state.

pub mod app_state;
pub mod session;
pub mod timer_state;

pub use app_state::AppState;
pub use session::{SessionDurations, SessionType, WORK_SESSIONS_PER_CYCLE};
pub use timer_state::TimerState;
