//! Stage 3 coordinator: prune, replicate, correct domains, export

use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::guard::MutualExclusionGuard;
use super::interrupt::InterruptSignal;
use super::matcher;
use super::report::{StageOutcome, StageReport};
use crate::config::StageConfig;
use crate::error::Result;
use crate::model::{ActionBatch, DomainChangeRule, NodeId, NodeState, ProcessingRecord};
use crate::preparation::{CleanupScope, PreparationService};
use crate::storage::{CoordinationStore, NodeKeys, NodeStore};

/// Position of this stage in the node status vector
pub const STAGE_NUMBER: usize = 3;

/// Result of the correction pass for one record
enum Correction {
    Unchanged,
    Submitted(usize),
    Failed,
}

/// Runs one firing of the stage for a node.
///
/// All side effects go through the coordination store and the preparation
/// service. A scheduling harness calls [`StageCoordinator::run`] and must not
/// start a second firing for the same node before the first returns.
pub struct StageCoordinator {
    store: Arc<dyn CoordinationStore>,
    service: Arc<dyn PreparationService>,
    config: Arc<StageConfig>,
    rules: Vec<DomainChangeRule>,
    interrupt: InterruptSignal,
}

impl StageCoordinator {
    pub fn new(
        store: Arc<dyn CoordinationStore>,
        service: Arc<dyn PreparationService>,
        config: StageConfig,
    ) -> Result<Self> {
        let rules = config.domain_change.rules()?;
        Ok(Self {
            store,
            service,
            config: Arc::new(config),
            rules,
            interrupt: InterruptSignal::new(),
        })
    }

    /// Share an externally owned interrupt signal (e.g. a Ctrl-C handler)
    pub fn with_interrupt(mut self, interrupt: InterruptSignal) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn interrupt(&self) -> &InterruptSignal {
        &self.interrupt
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn rules(&self) -> &[DomainChangeRule] {
        &self.rules
    }

    pub fn node_store(&self, node_id: NodeId) -> NodeStore {
        NodeStore::new(
            Arc::clone(&self.store),
            NodeKeys::new(self.config.store.key_prefix.clone(), node_id),
        )
    }

    /// Execute one firing for `node_id`
    pub async fn run(&self, node_id: NodeId) -> Result<StageReport> {
        let firing_id = Uuid::new_v4();
        let span = info_span!("stage3", node_id, %firing_id);
        self.run_firing(node_id, firing_id).instrument(span).await
    }

    async fn run_firing(&self, node_id: NodeId, firing_id: Uuid) -> Result<StageReport> {
        let mut report = StageReport::start(node_id, firing_id);
        let node = self.node_store(node_id);

        node.write_node_state(&NodeState::running(STAGE_NUMBER)).await?;

        let assignments = node.load_assignments().await?.unwrap_or_default();
        if assignments.is_empty() {
            info!("No assignments for node {}, nothing to do", node_id);
            return Ok(report.finish(StageOutcome::NoAssignments));
        }
        report.assigned = assignments.len();
        info!("Processing {} assigned records", assignments.len());

        let records = self.service.include_metadata(assignments).await?;
        let records = self.service.include_copy_target(records).await?;

        let guard = MutualExclusionGuard::new(self.config.settle_delay, self.interrupt.clone());

        let (kept, prunable): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|record| !record.is_prunable());
        report.pruned = prunable.len();
        for record in &prunable {
            if !self.delete_record_datasets(&guard, record).await {
                report.failed_deletions += 1;
            }
        }

        if !prunable.is_empty() {
            info!("Pruned {} records without a copy target", prunable.len());
            node.save_pruned(&kept).await?;
        }

        if kept.is_empty() {
            self.terminate(&node).await?;
            return Ok(report.finish(StageOutcome::Terminated));
        }

        let mut replicated = self
            .service
            .copy_preparations(kept, self.config.dependence_wait())
            .await?;
        report.replicated = replicated.len();
        info!("Replicated recipes onto {} records", replicated.len());

        for record in &mut replicated {
            match self.correct_domains(&guard, record).await {
                Correction::Submitted(actions) => report.actions_submitted += actions,
                Correction::Failed => report.failed_submissions += 1,
                Correction::Unchanged => {}
            }
        }

        node.save_export(&replicated).await?;
        report.done_possible = true;

        let report = report.finish(StageOutcome::Completed);
        info!("{}", report.summary());
        Ok(report)
    }

    /// Delete a pruned record's datasets under the guard. Returns false when
    /// the deletion failed or was skipped.
    async fn delete_record_datasets(
        &self,
        guard: &MutualExclusionGuard,
        record: &ProcessingRecord,
    ) -> bool {
        debug!("Deleting datasets {:?}", record.dataset_ids);
        let outcome = guard
            .run(
                "dataset deletion",
                self.service
                    .delete_datasets(&record.dataset_ids, self.config.dependence_wait()),
            )
            .await;

        match outcome {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                error!("Failed to delete datasets {:?}: {}", record.dataset_ids, e);
                false
            }
            None => false,
        }
    }

    /// Plan and submit domain corrections for one replicated record
    async fn correct_domains(
        &self,
        guard: &MutualExclusionGuard,
        record: &mut ProcessingRecord,
    ) -> Correction {
        let changes = matcher::plan(&self.rules, record);
        if changes.is_empty() {
            return Correction::Unchanged;
        }

        if record.preparation_ids.is_empty() {
            warn!(
                "Record for datasets {:?} has no preparations, {} domain changes dropped",
                record.dataset_ids,
                changes.len()
            );
            return Correction::Failed;
        }

        let mut batch = ActionBatch::default();
        for change in &changes {
            batch.push(self.service.build_domain_change_action(change));
        }

        let outcome = guard
            .run(
                "domain change submission",
                self.service.execute_actions(&record.preparation_ids, &batch),
            )
            .await;

        match outcome {
            Some(Ok(())) => {
                if let Some(target) = record.copy_target.as_mut() {
                    matcher::apply(target, &changes);
                }
                info!(
                    "Submitted {} domain changes to {:?}",
                    batch.len(),
                    record.preparation_ids
                );
                Correction::Submitted(batch.len())
            }
            Some(Err(e)) => {
                error!(
                    "Failed to submit domain changes to {:?}: {}",
                    record.preparation_ids, e
                );
                Correction::Failed
            }
            None => Correction::Failed,
        }
    }

    async fn terminate(&self, node: &NodeStore) -> Result<()> {
        info!("No records left after pruning, terminating");
        self.service.cleanup(CleanupScope::All).await?;

        if self.config.purge_keys_on_terminate {
            let removed = node.purge_intermediate().await?;
            debug!("Purged {} intermediate keys", removed);
        }
        Ok(())
    }
}
