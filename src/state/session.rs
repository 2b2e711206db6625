//! Session types and their nominal durations

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Number of work sessions in one cycle before a long break is granted
pub const WORK_SESSIONS_PER_CYCLE: u32 = 4;

/// One timed interval of the Pomodoro cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    Work,
    #[serde(alias = "short-break", alias = "short")]
    ShortBreak,
    #[serde(alias = "long-break", alias = "long")]
    LongBreak,
}

impl SessionType {
    pub fn label(&self) -> &'static str {
        match self {
            SessionType::Work => "Focus",
            SessionType::ShortBreak => "Short Break",
            SessionType::LongBreak => "Long Break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, SessionType::Work)
    }

    /// Title and body of the notification sent when this session ends
    pub fn completion_message(&self) -> (&'static str, &'static str) {
        if self.is_break() {
            ("Break Time Over!", "Ready to focus again?")
        } else {
            ("Focus Session Complete!", "Great work! Time for a break.")
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Nominal session lengths in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDurations {
    pub work: u64,
    pub short_break: u64,
    pub long_break: u64,
}

impl SessionDurations {
    pub fn new(work: u64, short_break: u64, long_break: u64) -> Self {
        // A zero-length session would violate total_seconds > 0
        Self {
            work: work.max(1),
            short_break: short_break.max(1),
            long_break: long_break.max(1),
        }
    }

    pub fn nominal(&self, session: SessionType) -> u64 {
        match session {
            SessionType::Work => self.work,
            SessionType::ShortBreak => self.short_break,
            SessionType::LongBreak => self.long_break,
        }
    }
}

impl Default for SessionDurations {
    fn default() -> Self {
        Self::new(25 * 60, 5 * 60, 15 * 60)
    }
}
