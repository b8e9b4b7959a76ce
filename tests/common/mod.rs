//! Common test utilities and helpers
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use prepsync::config::StageConfig;
use prepsync::model::{CopyTarget, MetadataInfo, NodeId, ProcessingRecord, SemanticCandidate};
use prepsync::preparation::MockPreparationService;
use prepsync::stage::StageCoordinator;
use prepsync::storage::{MemoryBackend, NodeStore};

pub const NODE: NodeId = 1;

/// Memory store, recording preparation mock and a coordinator wired to both
pub struct Harness {
    pub backend: MemoryBackend,
    pub mock: MockPreparationService,
    pub coordinator: StageCoordinator,
}

impl Harness {
    pub fn new(mock: MockPreparationService, config: StageConfig) -> Self {
        let backend = MemoryBackend::new();
        let coordinator =
            StageCoordinator::new(Arc::new(backend.clone()), Arc::new(mock.clone()), config)
                .unwrap();
        Self {
            backend,
            mock,
            coordinator,
        }
    }

    pub fn node(&self) -> NodeStore {
        self.coordinator.node_store(NODE)
    }

    pub async fn assign(&self, records: &[ProcessingRecord]) {
        self.node().save_assignments(records).await.unwrap();
    }
}

/// Node 1 config with no settle delay and the given rules
pub fn config_with_rules(rules: &[(i64, &str)]) -> StageConfig {
    let mut config = StageConfig::for_node(NODE);
    config.settle_delay = Duration::ZERO;
    config.dependence_wait_ms = 250;
    if !rules.is_empty() {
        config.domain_change.idx = rules.iter().map(|(idx, _)| *idx).collect();
        config.domain_change.value = rules.iter().map(|(_, v)| v.to_string()).collect();
    }
    config
}

pub fn candidate(id: &str, score: f32) -> SemanticCandidate {
    SemanticCandidate::new(id, format!("{} domain", id), score)
}

pub fn target(domains: &[&str], candidates: Vec<Vec<SemanticCandidate>>) -> CopyTarget {
    let mut target = CopyTarget::new(domains.iter().map(|d| d.to_string()).collect(), candidates);
    target.preparation_id = Some("T1".into());
    target
}

pub fn record(dataset_id: &str) -> ProcessingRecord {
    ProcessingRecord::new(vec![dataset_id.to_string()])
}

pub fn metadata(headers: &str) -> MetadataInfo {
    MetadataInfo::new(headers, ";")
}

pub fn dataset_ids(records: &[ProcessingRecord]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| r.dataset_ids.iter().cloned())
        .collect()
}
