use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_RULE_PRIORITY: i32 = 1;

/// Declarative rule: a condition tree plus the event fired when it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Higher priorities run first; equal priorities keep declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    pub conditions: Condition,
    pub event: RuleEvent,
}

impl Rule {
    pub fn priority(&self) -> i32 {
        self.priority.unwrap_or(DEFAULT_RULE_PRIORITY)
    }

    /// Label used in diagnostics, falling back to the event type.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("<{}>", self.event.kind),
        }
    }
}

/// Boolean combinators over leaf comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    All { all: Vec<Condition> },
    Any { any: Vec<Condition> },
    Not { not: Box<Condition> },
    Comparison(Comparison),
}

impl Condition {
    /// Every leaf comparison in the tree, depth first.
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut leaves = Vec::new();
        let mut pending = vec![self];
        while let Some(condition) = pending.pop() {
            match condition {
                Condition::All { all: children } | Condition::Any { any: children } => {
                    pending.extend(children.iter().rev());
                }
                Condition::Not { not } => pending.push(not),
                Condition::Comparison(comparison) => leaves.push(comparison),
            }
        }
        leaves
    }
}

/// Leaf comparison `{fact, operator, value}` with an optional JSONPath-style
/// selector into the fact's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub fact: String,
    pub operator: String,
    #[serde(default)]
    pub value: ConditionValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Right-hand side of a comparison: either a literal or another fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Fact(FactReference),
    Literal(Value),
}

impl Default for ConditionValue {
    fn default() -> Self {
        ConditionValue::Literal(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactReference {
    pub fact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Event emitted by a rule whose conditions evaluate true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RuleEvent {
    /// Payload reported to callers: `params` when present, otherwise the event.
    pub fn payload(&self) -> Value {
        match &self.params {
            Some(params) => params.clone(),
            None => serde_json::to_value(self).unwrap_or(Value::Null),
        }
    }
}
