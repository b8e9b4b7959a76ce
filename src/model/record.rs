//! Dataset assignment records exchanged between stages

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One dataset assignment unit.
///
/// Field names follow the JSON written by the earlier stages. Fields this
/// stage does not know about are carried through `extra` so they survive the
/// read-modify-write cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRecord {
    #[serde(default)]
    pub dataset_ids: Vec<String>,

    #[serde(default)]
    pub preparation_ids: Vec<String>,

    #[serde(rename = "metadataVO", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataInfo>,

    /// Preparation whose recipe is replicated onto this record's datasets.
    /// Absent means there is nothing to copy and the record gets pruned.
    #[serde(
        rename = "copyTargetPreparationInfoVO",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub copy_target: Option<CopyTarget>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProcessingRecord {
    pub fn new(dataset_ids: Vec<String>) -> Self {
        Self {
            dataset_ids,
            ..Default::default()
        }
    }

    pub fn with_copy_target(mut self, target: CopyTarget) -> Self {
        self.copy_target = Some(target);
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataInfo) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_prunable(&self) -> bool {
        self.copy_target.is_none()
    }

    /// Header names of the source file, empty when metadata was not attached
    pub fn header_names(&self) -> Vec<String> {
        self.metadata
            .as_ref()
            .map(MetadataInfo::header_names)
            .unwrap_or_default()
    }
}

/// File metadata attached by the preparation service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataInfo {
    /// Bracketed, comma separated header list, e.g. `"[id, name, email]"`
    #[serde(default)]
    pub headers: String,

    #[serde(default)]
    pub delimiter: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetadataInfo {
    pub fn new(headers: impl Into<String>, delimiter: impl Into<String>) -> Self {
        Self {
            headers: headers.into(),
            delimiter: delimiter.into(),
            extra: Map::new(),
        }
    }

    /// Parse the bracketed header string into individual names.
    ///
    /// Whitespace around each name is dropped; an empty string yields no
    /// headers.
    pub fn header_names(&self) -> Vec<String> {
        let inner = self.headers.replace(['[', ']'], "");
        if inner.trim().is_empty() {
            return Vec::new();
        }
        inner.split(',').map(|h| h.trim().to_string()).collect()
    }
}

/// Target preparation descriptor resolved for a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preparation_id: Option<String>,

    /// Currently assigned domain id per column
    #[serde(rename = "columnsDomains", default)]
    pub column_domains: Vec<String>,

    /// Ranked semantic domain candidates per column
    #[serde(rename = "semanticDomains", default)]
    pub semantic_candidates: Vec<Vec<SemanticCandidate>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CopyTarget {
    pub fn new(
        column_domains: Vec<String>,
        semantic_candidates: Vec<Vec<SemanticCandidate>>,
    ) -> Self {
        Self {
            preparation_id: None,
            column_domains,
            semantic_candidates,
            extra: Map::new(),
        }
    }

    pub fn current_domain(&self, column_index: usize) -> Option<&str> {
        self.column_domains.get(column_index).map(String::as_str)
    }

    /// Record a new domain for a column, growing the vector when the platform
    /// reported fewer columns than the candidate list.
    pub fn set_domain(&mut self, column_index: usize, domain_id: &str) {
        if self.column_domains.len() <= column_index {
            self.column_domains.resize(column_index + 1, String::new());
        }
        self.column_domains[column_index] = domain_id.to_string();
    }
}

/// One classified domain candidate for a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticCandidate {
    pub id: String,

    #[serde(default)]
    pub label: String,

    #[serde(alias = "frequency", default)]
    pub score: f32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SemanticCandidate {
    pub fn new(id: impl Into<String>, label: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            score,
            extra: Map::new(),
        }
    }
}
