use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::{PreparationError, PreparationResult};
use super::{CleanupScope, PreparationService};
use crate::model::{ActionBatch, CopyTarget, MetadataInfo, ProcessingRecord};

/// Operation names used to inject failures and filter the call history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreparationOp {
    IncludeMetadata,
    IncludeCopyTarget,
    DeleteDatasets,
    CopyPreparations,
    ExecuteActions,
    Cleanup,
}

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub enum PreparationCall {
    IncludeMetadata { records: usize },
    IncludeCopyTarget { records: usize },
    DeleteDatasets { dataset_ids: Vec<String>, wait_hint: Duration },
    CopyPreparations { dataset_ids: Vec<Vec<String>>, wait_hint: Duration },
    ExecuteActions { preparation_ids: Vec<String>, batch: ActionBatch },
    Cleanup { scope: CleanupScope },
}

impl PreparationCall {
    pub fn op(&self) -> PreparationOp {
        match self {
            Self::IncludeMetadata { .. } => PreparationOp::IncludeMetadata,
            Self::IncludeCopyTarget { .. } => PreparationOp::IncludeCopyTarget,
            Self::DeleteDatasets { .. } => PreparationOp::DeleteDatasets,
            Self::CopyPreparations { .. } => PreparationOp::CopyPreparations,
            Self::ExecuteActions { .. } => PreparationOp::ExecuteActions,
            Self::Cleanup { .. } => PreparationOp::Cleanup,
        }
    }
}

/// Mock implementation of PreparationService for testing.
///
/// Copy targets are resolved by the record's first dataset id; records that
/// already carry a target keep it. Copies assign `prep-<dataset id>`
/// preparation ids.
#[derive(Clone, Default)]
pub struct MockPreparationService {
    metadata: Arc<Mutex<Option<MetadataInfo>>>,
    targets: Arc<Mutex<HashMap<String, CopyTarget>>>,
    failures: Arc<Mutex<HashSet<PreparationOp>>>,
    calls: Arc<Mutex<Vec<PreparationCall>>>,
}

impl MockPreparationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata attached to records that have none
    pub fn with_metadata(self, metadata: MetadataInfo) -> Self {
        *self.metadata.lock().unwrap() = Some(metadata);
        self
    }

    /// Copy target returned for records whose first dataset is `dataset_id`
    pub fn with_target(self, dataset_id: &str, target: CopyTarget) -> Self {
        self.targets
            .lock()
            .unwrap()
            .insert(dataset_id.to_string(), target);
        self
    }

    /// Make every call to `op` fail with a server error
    pub fn fail_on(self, op: PreparationOp) -> Self {
        self.failures.lock().unwrap().insert(op);
        self
    }

    pub fn calls(&self) -> Vec<PreparationCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, op: PreparationOp) -> Vec<PreparationCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.op() == op)
            .collect()
    }

    pub fn count(&self, op: PreparationOp) -> usize {
        self.calls_to(op).len()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: PreparationCall) -> PreparationResult<()> {
        let op = call.op();
        self.calls.lock().unwrap().push(call);

        if self.failures.lock().unwrap().contains(&op) {
            return Err(PreparationError::Status {
                status: 500,
                body: format!("mock failure for {:?}", op),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PreparationService for MockPreparationService {
    async fn include_metadata(
        &self,
        records: Vec<ProcessingRecord>,
    ) -> PreparationResult<Vec<ProcessingRecord>> {
        self.record(PreparationCall::IncludeMetadata {
            records: records.len(),
        })?;

        let metadata = self.metadata.lock().unwrap().clone();
        Ok(records
            .into_iter()
            .map(|mut record| {
                if record.metadata.is_none() {
                    record.metadata = metadata.clone();
                }
                record
            })
            .collect())
    }

    async fn include_copy_target(
        &self,
        records: Vec<ProcessingRecord>,
    ) -> PreparationResult<Vec<ProcessingRecord>> {
        self.record(PreparationCall::IncludeCopyTarget {
            records: records.len(),
        })?;

        let targets = self.targets.lock().unwrap().clone();
        Ok(records
            .into_iter()
            .map(|mut record| {
                if record.copy_target.is_none() {
                    record.copy_target = record
                        .dataset_ids
                        .first()
                        .and_then(|id| targets.get(id))
                        .cloned();
                }
                record
            })
            .collect())
    }

    async fn delete_datasets(
        &self,
        dataset_ids: &[String],
        wait_hint: Duration,
    ) -> PreparationResult<()> {
        self.record(PreparationCall::DeleteDatasets {
            dataset_ids: dataset_ids.to_vec(),
            wait_hint,
        })
    }

    async fn copy_preparations(
        &self,
        records: Vec<ProcessingRecord>,
        wait_hint: Duration,
    ) -> PreparationResult<Vec<ProcessingRecord>> {
        self.record(PreparationCall::CopyPreparations {
            dataset_ids: records.iter().map(|r| r.dataset_ids.clone()).collect(),
            wait_hint,
        })?;

        Ok(records
            .into_iter()
            .map(|mut record| {
                record.preparation_ids = record
                    .dataset_ids
                    .iter()
                    .map(|id| format!("prep-{}", id))
                    .collect();
                record
            })
            .collect())
    }

    async fn execute_actions(
        &self,
        preparation_ids: &[String],
        batch: &ActionBatch,
    ) -> PreparationResult<()> {
        self.record(PreparationCall::ExecuteActions {
            preparation_ids: preparation_ids.to_vec(),
            batch: batch.clone(),
        })
    }

    async fn cleanup(&self, scope: CleanupScope) -> PreparationResult<()> {
        self.record(PreparationCall::Cleanup { scope })
    }
}
