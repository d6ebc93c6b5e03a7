//! Run event type recorded by the event log.

use super::EventLevel;
use crate::utils::{format_iso8601, generate_event_id, now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable record of something that happened during a run.
///
/// Events are append-only: two calls with the same message and level
/// produce two distinct events with independent timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    /// Unique, time-ordered event identifier.
    pub id: Uuid,

    /// When the event was recorded.
    pub timestamp: Timestamp,

    /// Event severity.
    pub level: EventLevel,

    /// Human-readable message.
    pub message: String,
}

impl RunEvent {
    /// Creates a new event stamped with the current time.
    #[must_use]
    pub fn new(level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            id: generate_event_id(),
            timestamp: now_utc(),
            level,
            message: message.into(),
        }
    }

    /// Creates an info event.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Info, message)
    }

    /// Creates a warning event.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Warning, message)
    }

    /// Creates an error event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Error, message)
    }

    /// Returns the timestamp formatted as ISO 8601.
    #[must_use]
    pub fn iso_timestamp(&self) -> String {
        format_iso8601(&self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = RunEvent::new(EventLevel::Info, "run started");
        assert_eq!(event.level, EventLevel::Info);
        assert_eq!(event.message, "run started");
    }

    #[test]
    fn test_identical_events_are_distinct() {
        let first = RunEvent::warning("same");
        let second = RunEvent::warning("same");
        assert_ne!(first, second);
        assert!(second.timestamp >= first.timestamp);
    }

    #[test]
    fn test_event_serialization() {
        let event = RunEvent::error("Acquire: no items survived");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["level"], "error");
        assert_eq!(json["message"], "Acquire: no items survived");

        let deserialized: RunEvent = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized, event);
    }
}
