//! Per-node key layout in the coordination store

use crate::model::NodeId;

/// Status vector of the node's four stages
pub const JOB_STATUS_NODE: &str = "JOB_STATUS_NODE_";
/// Raw assignment list produced by the earlier stages
pub const LIST_OF_DATASET_INFO: &str = "LIST_OF_DATASET_INFO_";
/// Assignment list after records without a copy target were pruned
pub const INCLUDE_PREPARATION_TARGET_INFO: &str = "INCLUDE_PREPARATION_TARGET_INFO_";
/// Final list handed to the export stage
pub const LIST_OF_EXPORT: &str = "LIST_OF_EXPORT_";
pub const INCLUDE_META_INFO: &str = "INCLUDE_META_INFO_";
pub const LIST_OF_FILES_TO_BE_PROCESSED: &str = "LIST_OF_FILES_TO_BE_PROCESSED_";
pub const TARGET_PREPARATION_CANDIDATE: &str = "TARGET_PREPARATION_CANDIDATE_";

/// Key names for one node, with an optional deployment-wide prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeKeys {
    prefix: String,
    node_id: NodeId,
}

impl NodeKeys {
    pub fn new(prefix: impl Into<String>, node_id: NodeId) -> Self {
        Self {
            prefix: prefix.into(),
            node_id,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    fn key(&self, base: &str) -> String {
        format!("{}{}{}", self.prefix, base, self.node_id)
    }

    pub fn node_status(&self) -> String {
        self.key(JOB_STATUS_NODE)
    }

    pub fn assignments(&self) -> String {
        self.key(LIST_OF_DATASET_INFO)
    }

    pub fn pruned(&self) -> String {
        self.key(INCLUDE_PREPARATION_TARGET_INFO)
    }

    pub fn export(&self) -> String {
        self.key(LIST_OF_EXPORT)
    }

    /// Keys dropped by the optional per-key cleanup on terminate.
    ///
    /// Status and export keys are not part of this set; later stages still
    /// read them.
    pub fn terminate_cleanup(&self) -> Vec<String> {
        [
            INCLUDE_PREPARATION_TARGET_INFO,
            INCLUDE_META_INFO,
            LIST_OF_DATASET_INFO,
            LIST_OF_FILES_TO_BE_PROCESSED,
            TARGET_PREPARATION_CANDIDATE,
        ]
        .iter()
        .map(|base| self.key(base))
        .collect()
    }
}
