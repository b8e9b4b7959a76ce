//! Per-node stage status vector

use serde::{Deserialize, Serialize};

/// Status of one pipeline stage on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    New,
    Running,
    Done,
}

/// Number of scheduled stages every node runs
pub const STAGE_COUNT: usize = 4;

/// Status of the four stages of a node, stored as a JSON array
/// (`["DONE","DONE","RUNNING","NEW"]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeState(pub [StageStatus; STAGE_COUNT]);

impl NodeState {
    /// State written when stage `stage` (1-based) starts: earlier stages are
    /// done, later ones new.
    pub fn running(stage: usize) -> Self {
        let mut statuses = [StageStatus::New; STAGE_COUNT];
        for (i, status) in statuses.iter_mut().enumerate() {
            *status = match (i + 1).cmp(&stage) {
                std::cmp::Ordering::Less => StageStatus::Done,
                std::cmp::Ordering::Equal => StageStatus::Running,
                std::cmp::Ordering::Greater => StageStatus::New,
            };
        }
        Self(statuses)
    }

    pub fn stage(&self, stage: usize) -> Option<StageStatus> {
        stage
            .checked_sub(1)
            .and_then(|i| self.0.get(i))
            .copied()
    }
}
