//! Event types for schedule construction
//!
//! Events are sent from the scheduler to any consumer (an editor, a
//! director, a test) to report built schedules, failures, invalidation
//! and unreachable-actor diagnostics.

use serde::{Deserialize, Serialize};

/// Trait for sending schedule events
///
/// This abstracts over the transport mechanism (channel, UI bridge, etc.)
/// so the scheduler can be used in different contexts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: ScheduleEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted while building schedules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScheduleEvent {
    /// A schedule was assembled
    #[serde(rename_all = "camelCase")]
    ScheduleBuilt {
        session_id: String,
        process: Option<String>,
        independent: usize,
        dependents: usize,
        subgraphs: usize,
    },

    /// Schedule construction failed
    #[serde(rename_all = "camelCase")]
    ScheduleFailed {
        session_id: String,
        process: Option<String>,
        error: String,
    },

    /// The cached schedule was discarded
    #[serde(rename_all = "camelCase")]
    ScheduleInvalidated { reason: String },

    /// Upstream actors that nothing will fire
    #[serde(rename_all = "camelCase")]
    UnreachableActors {
        session_id: String,
        actors: Vec<String>,
    },
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: ScheduleEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<ScheduleEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<ScheduleEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: ScheduleEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError::channel_closed())?
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();

        sink.send(ScheduleEvent::ScheduleInvalidated {
            reason: "topology changed".to_string(),
        })
        .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ScheduleEvent::ScheduleInvalidated { reason } => {
                assert_eq!(reason, "topology changed");
            }
            _ => panic!("Expected ScheduleInvalidated event"),
        }

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_event_serialization() {
        let event = ScheduleEvent::UnreachableActors {
            session_id: "s1".to_string(),
            actors: vec!["orphan".to_string()],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"unreachableActors\""));
        assert!(json.contains("\"sessionId\":\"s1\""));
    }
}
