//! Repeating countdown driver and wall clock

use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant},
};

/// Callback fired on every driver period
pub type TickCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// Stops a scheduled repeating task. After `cancel` returns the callback
/// is never invoked again.
pub trait CancelHandle: Send {
    fn cancel(&mut self);
}

/// Capability to run a callback every `interval`
pub trait Scheduler: Send {
    fn schedule_repeating(&self, interval: Duration, callback: TickCallback)
        -> Box<dyn CancelHandle>;
}

/// Driver backed by a tokio interval task
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule_repeating(
        &self,
        interval: Duration,
        callback: TickCallback,
    ) -> Box<dyn CancelHandle> {
        let task = tokio::spawn(async move {
            // First tick one full period after activation
            let mut ticker = interval_at(Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                callback();
            }
        });
        Box::new(TokioCancelHandle(task))
    }
}

struct TokioCancelHandle(JoinHandle<()>);

impl CancelHandle for TokioCancelHandle {
    fn cancel(&mut self) {
        self.0.abort();
    }
}

impl Drop for TokioCancelHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Source of wall-clock time in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_epoch_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
