//! Durable storage for the timer state record
//!
//! Exactly one record is kept and overwritten on every save.

pub mod background;
pub mod file;

use std::sync::{Arc, Mutex};

use crate::{error::Result, state::TimerState};

pub use background::BackgroundStore;
pub use file::JsonFileStore;

/// Where the engine keeps its recovery snapshot
pub trait StateStore: Send + Sync {
    /// Load the last record. `Ok(None)` means nothing was ever saved.
    fn load(&self) -> Result<Option<TimerState>>;

    /// Overwrite the record
    fn save(&self, state: &TimerState) -> Result<()>;
}

/// In-process store for `--ephemeral` runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: Arc<Mutex<Option<TimerState>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the store as if a previous process had saved `state`
    pub fn with_record(state: TimerState) -> Self {
        Self {
            record: Arc::new(Mutex::new(Some(state))),
        }
    }

    pub fn snapshot(&self) -> Option<TimerState> {
        self.record.lock().ok().and_then(|record| record.clone())
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<TimerState>> {
        Ok(self.snapshot())
    }

    fn save(&self, state: &TimerState) -> Result<()> {
        if let Ok(mut record) = self.record.lock() {
            *record = Some(state.clone());
        }
        Ok(())
    }
}
