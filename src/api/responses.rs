//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{cycle::CycleEvent, state::CycleSnapshot};

/// API response structure for cycle commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub cycle: CycleSnapshot,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, cycle: CycleSnapshot) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            cycle,
        }
    }

    /// Create an applied response
    pub fn applied(message: String, cycle: CycleSnapshot) -> Self {
        Self::new("applied".to_string(), message, cycle)
    }

    /// Create an ignored response for a command that was not valid in this phase
    pub fn ignored(message: String, cycle: CycleSnapshot) -> Self {
        Self::new("ignored".to_string(), message, cycle)
    }

    /// Build the response for the outcome of `command`
    pub fn from_outcome(command: &str, event: Option<CycleEvent>, cycle: CycleSnapshot) -> Self {
        match event {
            Some(event) => Self::applied(describe(event), cycle),
            None => {
                let message = format!("{} ignored while {:?}", command, cycle.phase).to_lowercase();
                Self::ignored(message, cycle)
            }
        }
    }
}

fn describe(event: CycleEvent) -> String {
    match event {
        CycleEvent::Started => "Cycle started".to_string(),
        CycleEvent::Paused => "Cycle paused".to_string(),
        CycleEvent::Resumed => "Cycle resumed".to_string(),
        CycleEvent::Reset => "Cycle reset".to_string(),
        CycleEvent::Restored { full_rounds, leftover_seconds } => format!(
            "Caught up {} full rounds and {}s",
            full_rounds, leftover_seconds
        ),
    }
}

/// Status response with server information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub cycle: CycleSnapshot,
    pub foreground: bool,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
