//! User-facing notifications for completed sessions

use clap::ValueEnum;
use tokio::{process::Command, runtime::Handle};
use tracing::{debug, info, warn};

use crate::error::{Result, TomatoError};

/// Receives "session ended" messages. Dispatch is fire-and-forget: an `Err`
/// only means the notification could not be handed off.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Which notifier the daemon should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NotifierKind {
    /// Write notifications to the log only
    Log,
    /// Desktop notification through `notify-send`
    Desktop,
}

impl NotifierKind {
    pub fn build(self) -> Box<dyn Notifier> {
        match self {
            NotifierKind::Log => Box::new(LogNotifier),
            NotifierKind::Desktop => Box::new(DesktopNotifier::default()),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        info!("🍅 {} {}", title, body);
        Ok(())
    }
}

/// Shells out to a freedesktop notification helper
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    program: String,
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            app_name: "tomato-daemon".to_string(),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new("notify-send")
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        let handle = Handle::try_current()
            .map_err(|e| TomatoError::Notify(format!("no async runtime: {}", e)))?;

        let program = self.program.clone();
        let args = vec![
            "--app-name".to_string(),
            self.app_name.clone(),
            "--urgency".to_string(),
            "critical".to_string(),
            title.to_string(),
            body.to_string(),
        ];

        handle.spawn(async move {
            debug!("Sending desktop notification via {}", program);
            match Command::new(&program).args(&args).output().await {
                Ok(output) if output.status.success() => {}
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    warn!("{} failed: {}", program, stderr.trim());
                }
                Err(e) => warn!("Failed to execute {}: {}", program, e),
            }
        });

        Ok(())
    }
}
