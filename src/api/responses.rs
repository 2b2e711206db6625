//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error body for requests the engine could not serve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn unavailable(message: String) -> Self {
        Self {
            status: "unavailable".to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime: String,
    pub last_command: Option<String>,
    pub last_command_time: Option<DateTime<Utc>>,
}

impl HealthResponse {
    pub fn ok(
        uptime: String,
        last_command: Option<String>,
        last_command_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime,
            last_command,
            last_command_time,
        }
    }
}
