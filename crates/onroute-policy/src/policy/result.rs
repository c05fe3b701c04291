use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rules::RuleEvent;

/// Bucket a fired event is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Violation,
    Requirement,
    Warning,
    Information,
}

impl EventKind {
    /// Unknown or missing types are treated as violations.
    pub fn classify(kind: &str) -> Self {
        match kind {
            "requirement" => EventKind::Requirement,
            "warning" => EventKind::Warning,
            "information" => EventKind::Information,
            _ => EventKind::Violation,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            EventKind::Violation => "violation",
            EventKind::Requirement => "requirement",
            EventKind::Warning => "warning",
            EventKind::Information => "information",
        }
    }
}

/// Aggregated outcome of validating one application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub violations: Vec<Value>,
    pub requirements: Vec<Value>,
    pub warnings: Vec<Value>,
    pub information: Vec<Value>,
}

impl ValidationResult {
    pub fn push(&mut self, kind: EventKind, payload: Value) {
        let bucket = match kind {
            EventKind::Violation => &mut self.violations,
            EventKind::Requirement => &mut self.requirements,
            EventKind::Warning => &mut self.warnings,
            EventKind::Information => &mut self.information,
        };
        bucket.push(payload);
    }

    pub fn record(&mut self, event: &RuleEvent) {
        self.push(EventKind::classify(&event.kind), event.payload());
    }

    /// No violations were raised; other buckets do not block issuance.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// `message` entries of a bucket, skipping payloads without one.
    pub fn messages(&self, kind: EventKind) -> Vec<&str> {
        let bucket = match kind {
            EventKind::Violation => &self.violations,
            EventKind::Requirement => &self.requirements,
            EventKind::Warning => &self.warnings,
            EventKind::Information => &self.information,
        };
        bucket
            .iter()
            .filter_map(|payload| payload.get("message").and_then(Value::as_str))
            .collect()
    }
}

impl<'a> FromIterator<&'a RuleEvent> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = &'a RuleEvent>>(events: I) -> Self {
        let mut result = ValidationResult::default();
        for event in events {
            result.record(event);
        }
        result
    }
}
