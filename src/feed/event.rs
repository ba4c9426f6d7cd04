//! Log event record pushed over the live feed.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Event severity as seen by feed subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// One progress event from a pipeline stage.
///
/// Serialized to subscribers as `{timestamp, agent, message, level}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    /// RFC 3339 timestamp taken at emission
    pub timestamp: String,
    /// Name of the emitting stage (or "orchestrator")
    pub agent: String,
    /// Human-readable progress message
    pub message: String,
    /// Severity
    pub level: LogLevel,
}

impl LogEvent {
    /// Create an event stamped with the current time.
    pub fn now(agent: &str, message: impl Into<String>, level: LogLevel) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            agent: agent.to_string(),
            message: message.into(),
            level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let event = LogEvent::now("augmentation_planning", "Finished.", LogLevel::Warning);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["agent"], "augmentation_planning");
        assert_eq!(json["message"], "Finished.");
        assert_eq!(json["level"], "warning");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_level_round_trip() {
        for level in [LogLevel::Info, LogLevel::Warning, LogLevel::Error] {
            let json = serde_json::to_string(&level).unwrap();
            let back: LogLevel = serde_json::from_str(&json).unwrap();
            assert_eq!(level, back);
        }
    }
}
