//! Where a display adapter draws

use std::io::Write;

use crate::{
    state::{SessionType, TimerState},
    utils::format_mmss,
};

/// Whether the displayed state comes from the engine or a local shadow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Mirroring the engine's canonical state
    Authoritative,
    /// Engine unreachable, counting down locally on a best-effort basis
    Fallback,
}

impl SyncMode {
    pub fn badge(&self) -> &'static str {
        match self {
            SyncMode::Authoritative => "live",
            SyncMode::Fallback => "offline",
        }
    }
}

/// One rendered view of the timer
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFrame {
    pub clock: String,
    pub session: SessionType,
    pub running: bool,
    pub cycle_count: u32,
    pub progress: f64,
    pub mode: SyncMode,
}

impl DisplayFrame {
    pub fn new(state: &TimerState, mode: SyncMode) -> Self {
        Self {
            clock: format_mmss(state.remaining_seconds),
            session: state.session,
            running: state.running,
            cycle_count: state.cycle_count,
            progress: state.progress(),
            mode,
        }
    }

    /// Single-line terminal rendering
    pub fn to_line(&self) -> String {
        format!(
            "[{:<11}] {} {} cycle {} {:>3.0}% ({})",
            self.session.label(),
            self.clock,
            if self.running { "▶" } else { "⏸" },
            self.cycle_count,
            self.progress * 100.0,
            self.mode.badge(),
        )
    }
}

pub trait DisplaySurface: Send {
    fn render(&mut self, frame: &DisplayFrame);

    /// Local cue for a finished session, independent of the engine's
    /// own notification
    fn completion_cue(&mut self, ended: SessionType);

    /// Short message such as a rejected command
    fn notice(&mut self, message: &str);
}

/// Redraws one status line on a terminal
#[derive(Debug, Default)]
pub struct TerminalSurface {
    last_line: Option<String>,
}

impl DisplaySurface for TerminalSurface {
    fn render(&mut self, frame: &DisplayFrame) {
        let line = frame.to_line();
        if self.last_line.as_deref() == Some(line.as_str()) {
            return;
        }
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\r\x1b[2K{}", line);
        let _ = out.flush();
        self.last_line = Some(line);
    }

    fn completion_cue(&mut self, ended: SessionType) {
        // Terminal bell
        println!("\x07\r\x1b[2K*** {} complete! ***", ended);
        self.last_line = None;
    }

    fn notice(&mut self, message: &str) {
        println!("\r\x1b[2K! {}", message);
        self.last_line = None;
    }
}
