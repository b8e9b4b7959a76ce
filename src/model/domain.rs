//! Domain-change rules and the corrections derived from them

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column whose semantic domain should be forced to `desired_domain_id`
/// whenever the platform proposes that domain as a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainChangeRule {
    pub column_index: usize,
    pub desired_domain_id: String,
}

impl DomainChangeRule {
    pub fn new(column_index: usize, desired_domain_id: impl Into<String>) -> Self {
        Self {
            column_index,
            desired_domain_id: desired_domain_id.into(),
        }
    }
}

/// A correction chosen by the matcher for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainChange {
    pub column_index: usize,
    pub header: String,
    pub score: f32,
    pub domain_id: String,
    pub label: String,
}

impl DomainChange {
    /// Score rendered the way the platform expects it in action parameters
    /// (`0.9`, `1.0`).
    pub fn score_string(&self) -> String {
        if self.score.fract() == 0.0 {
            format!("{:.1}", self.score)
        } else {
            self.score.to_string()
        }
    }
}

/// Opaque action descriptor built by the preparation service
pub type ActionDescriptor = Value;

/// Actions submitted to a preparation in one call, `{"actions": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionBatch {
    pub actions: Vec<ActionDescriptor>,
}

impl ActionBatch {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn push(&mut self, action: ActionDescriptor) {
        self.actions.push(action);
    }
}
