//! External side-effect services

pub mod notifier;

pub use notifier::{DesktopNotifier, LogNotifier, Notifier, NotifierKind};
