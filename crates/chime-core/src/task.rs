//! Task payload types — shared between the scheduler engine and queue consumers.

use serde::{Deserialize, Serialize};

/// An opaque unit-of-work descriptor.
///
/// Created by whatever host feature registers a schedule; handed to the work
/// queue verbatim when the schedule fires. The engine never looks inside
/// `payload`; routing and execution belong to the worker reading the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Worker-side discriminator, e.g. `"report.generate"`. Also what failure
    /// logs show, so keep it meaningful.
    pub kind: String,
    /// Arbitrary JSON forwarded to the worker.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Task {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// A task carrying no payload beyond its kind.
    pub fn bare(kind: impl Into<String>) -> Self {
        Self::new(kind, serde_json::Value::Null)
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_payload() {
        let task = Task::new("report.generate", serde_json::json!({"week": 12}));
        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn missing_payload_defaults_to_null() {
        let task: Task = serde_json::from_str(r#"{"kind":"ping"}"#).unwrap();
        assert_eq!(task.payload, serde_json::Value::Null);
    }

    #[test]
    fn display_shows_kind() {
        let task = Task::bare("cache.warm");
        assert_eq!(task.to_string(), "cache.warm");
    }
}
