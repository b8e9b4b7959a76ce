//! Data exchanged between the pipeline stages through the coordination store

pub mod domain;
pub mod record;
pub mod state;

pub use domain::{ActionBatch, ActionDescriptor, DomainChange, DomainChangeRule};
pub use record::{CopyTarget, MetadataInfo, ProcessingRecord, SemanticCandidate};
pub use state::{NodeState, StageStatus, STAGE_COUNT};

/// Worker node identifier
pub type NodeId = u32;
