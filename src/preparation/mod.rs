//! Preparation platform abstraction
//!
//! Trait-based access to the data-preparation platform so the stage can be
//! exercised without a running platform. `HttpPreparationService` talks to
//! the platform's stage endpoints; `MockPreparationService` records calls for
//! tests.

pub mod error;
pub mod http;
pub mod mock;

pub use error::{PreparationError, PreparationResult};
pub use http::{HttpPreparationService, PreparationConfig};
pub use mock::{MockPreparationService, PreparationCall, PreparationOp};

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::model::{ActionBatch, ActionDescriptor, DomainChange, ProcessingRecord};

/// Scope of the platform-side cleanup run when a stage has nothing left to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupScope {
    /// Everything the platform holds for this node
    All,
}

impl CleanupScope {
    /// Value sent to the platform; `-1` is the "all data" sentinel
    pub fn as_wire(&self) -> i64 {
        match self {
            Self::All => -1,
        }
    }
}

/// Operations the stage needs from the preparation platform
#[async_trait]
pub trait PreparationService: Send + Sync {
    /// Attach file metadata (headers, delimiter) to every record
    async fn include_metadata(
        &self,
        records: Vec<ProcessingRecord>,
    ) -> PreparationResult<Vec<ProcessingRecord>>;

    /// Resolve the preparation whose recipe should be copied onto each record.
    /// Records without a match come back with no copy target.
    async fn include_copy_target(
        &self,
        records: Vec<ProcessingRecord>,
    ) -> PreparationResult<Vec<ProcessingRecord>>;

    /// Delete datasets; `wait_hint` is how long the platform may take between
    /// deletions
    async fn delete_datasets(&self, dataset_ids: &[String], wait_hint: Duration)
        -> PreparationResult<()>;

    /// Copy the target recipe onto each record's datasets, filling in
    /// `preparation_ids`
    async fn copy_preparations(
        &self,
        records: Vec<ProcessingRecord>,
        wait_hint: Duration,
    ) -> PreparationResult<Vec<ProcessingRecord>>;

    /// Build the action descriptor that changes one column's domain
    fn build_domain_change_action(&self, change: &DomainChange) -> ActionDescriptor {
        domain_change_action(change)
    }

    /// Append actions to the given preparations
    async fn execute_actions(
        &self,
        preparation_ids: &[String],
        batch: &ActionBatch,
    ) -> PreparationResult<()>;

    /// Remove platform data left behind for the node
    async fn cleanup(&self, scope: CleanupScope) -> PreparationResult<()>;
}

/// `domain_change` action in the platform's action format
pub fn domain_change_action(change: &DomainChange) -> ActionDescriptor {
    json!({
        "action": "domain_change",
        "parameters": {
            "scope": "column",
            "column_id": format!("{:04}", change.column_index),
            "column_name": change.header,
            "new_domain_id": change.domain_id,
            "new_domain_label": change.label,
            "new_domain_frequency": change.score_string(),
        }
    })
}
