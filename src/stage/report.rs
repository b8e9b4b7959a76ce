//! Outcome of one stage firing

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::model::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// Nothing was assigned to the node
    NoAssignments,
    /// Every record was pruned and the platform-side cleanup ran
    Terminated,
    /// Records were replicated, corrected and exported
    Completed,
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoAssignments => "no assignments",
            Self::Terminated => "terminated",
            Self::Completed => "completed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub node_id: NodeId,
    pub firing_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: StageOutcome,
    pub assigned: usize,
    pub pruned: usize,
    pub replicated: usize,
    pub actions_submitted: usize,
    pub failed_deletions: usize,
    pub failed_submissions: usize,
    /// Set once the export list has been written
    pub done_possible: bool,
}

impl StageReport {
    pub fn start(node_id: NodeId, firing_id: Uuid) -> Self {
        Self {
            node_id,
            firing_id,
            started_at: Utc::now(),
            finished_at: None,
            outcome: StageOutcome::NoAssignments,
            assigned: 0,
            pruned: 0,
            replicated: 0,
            actions_submitted: 0,
            failed_deletions: 0,
            failed_submissions: 0,
            done_possible: false,
        }
    }

    pub fn finish(mut self, outcome: StageOutcome) -> Self {
        self.outcome = outcome;
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    pub fn summary(&self) -> String {
        format!(
            "node {}: {} (assigned {}, pruned {}, replicated {}, actions {}, failed deletions {}, failed submissions {})",
            self.node_id,
            self.outcome,
            self.assigned,
            self.pruned,
            self.replicated,
            self.actions_submitted,
            self.failed_deletions,
            self.failed_submissions
        )
    }
}
