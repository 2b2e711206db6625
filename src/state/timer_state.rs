//! Canonical timer state and its pure transition rules

use serde::{Deserialize, Serialize};

use super::session::{SessionDurations, SessionType, WORK_SESSIONS_PER_CYCLE};

/// Snapshot of the countdown, also the durable record layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub session: SessionType,
    pub remaining_seconds: u64,
    pub total_seconds: u64,
    pub running: bool,
    pub cycle_count: u32,
    pub last_persisted_at_epoch_ms: i64,
}

impl TimerState {
    /// A stopped, full-length session of the given type
    pub fn fresh(session: SessionType, durations: &SessionDurations) -> Self {
        let total = durations.nominal(session);
        Self {
            session,
            remaining_seconds: total,
            total_seconds: total,
            running: false,
            cycle_count: 1,
            last_persisted_at_epoch_ms: 0,
        }
    }

    /// Default state when nothing was persisted
    pub fn initial(durations: &SessionDurations) -> Self {
        Self::fresh(SessionType::Work, durations)
    }

    /// Refill the countdown with the nominal length of `session`
    pub fn begin(&mut self, session: SessionType, durations: &SessionDurations) {
        let total = durations.nominal(session);
        self.session = session;
        self.total_seconds = total;
        self.remaining_seconds = total;
    }

    /// Apply the advancement rule after `self.session` completed.
    ///
    /// Work moves to a short break, except every fourth work session which
    /// moves to a long break and restarts the cycle. Breaks always lead back
    /// to work. Returns the session that ended.
    pub fn advance(&mut self, durations: &SessionDurations) -> SessionType {
        let ended = self.session;
        let next = match ended {
            SessionType::Work => {
                let count = self.cycle_count.saturating_add(1);
                if count > WORK_SESSIONS_PER_CYCLE {
                    self.cycle_count = 1;
                    SessionType::LongBreak
                } else {
                    self.cycle_count = count;
                    SessionType::ShortBreak
                }
            }
            SessionType::ShortBreak | SessionType::LongBreak => SessionType::Work,
        };
        self.running = false;
        self.begin(next, durations);
        ended
    }

    /// Whole seconds of wall-clock time since the last durable write.
    /// A clock that moved backwards counts as no time passing.
    pub fn elapsed_since_persist(&self, now_epoch_ms: i64) -> u64 {
        let delta = now_epoch_ms.saturating_sub(self.last_persisted_at_epoch_ms);
        if delta <= 0 {
            0
        } else {
            (delta / 1000) as u64
        }
    }

    /// Bring a loaded record back within the invariants
    pub fn clamped(mut self, durations: &SessionDurations) -> Self {
        if self.total_seconds == 0 {
            self.total_seconds = durations.nominal(self.session);
        }
        self.remaining_seconds = self.remaining_seconds.min(self.total_seconds);
        self.cycle_count = self.cycle_count.clamp(1, WORK_SESSIONS_PER_CYCLE);
        self
    }

    /// Where a running record's countdown would stand at `now_epoch_ms`.
    /// A countdown that ran out moves on to the next session, stopped.
    pub fn caught_up(mut self, now_epoch_ms: i64, durations: &SessionDurations) -> Self {
        if self.running {
            let elapsed = self.elapsed_since_persist(now_epoch_ms);
            self.remaining_seconds = self.remaining_seconds.saturating_sub(elapsed);
            if self.remaining_seconds == 0 {
                self.advance(durations);
            }
        }
        self
    }

    /// Completed fraction of the current session, 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        if self.total_seconds == 0 {
            return 1.0;
        }
        1.0 - (self.remaining_seconds as f64 / self.total_seconds as f64)
    }
}
