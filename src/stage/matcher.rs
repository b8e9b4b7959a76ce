//! Semantic domain matching
//!
//! A rule `(column, domain)` fires when the platform lists `domain` among the
//! column's candidates and the column is not already assigned that domain.
//! Candidates are scanned in rank order and the first match wins.

use tracing::{debug, warn};

use crate::model::{CopyTarget, DomainChange, DomainChangeRule, ProcessingRecord, SemanticCandidate};

/// Decide whether `rule` produces a correction for one column
pub fn decide(
    rule: &DomainChangeRule,
    candidates: &[SemanticCandidate],
    current_domain: Option<&str>,
    header: &str,
) -> Option<DomainChange> {
    if current_domain == Some(rule.desired_domain_id.as_str()) {
        return None;
    }

    candidates
        .iter()
        .find(|candidate| candidate.id == rule.desired_domain_id)
        .map(|candidate| DomainChange {
            column_index: rule.column_index,
            header: header.to_string(),
            score: candidate.score,
            domain_id: candidate.id.clone(),
            label: candidate.label.clone(),
        })
}

/// Evaluate every rule, in order, against one record
pub fn plan(rules: &[DomainChangeRule], record: &ProcessingRecord) -> Vec<DomainChange> {
    let Some(target) = record.copy_target.as_ref() else {
        return Vec::new();
    };
    let headers = record.header_names();

    rules
        .iter()
        .filter_map(|rule| {
            let Some(candidates) = target.semantic_candidates.get(rule.column_index) else {
                warn!(
                    "Column {} out of range ({} columns with candidates), rule for {} skipped",
                    rule.column_index,
                    target.semantic_candidates.len(),
                    rule.desired_domain_id
                );
                return None;
            };

            let header = headers
                .get(rule.column_index)
                .map(String::as_str)
                .unwrap_or_default();
            let change = decide(
                rule,
                candidates,
                target.current_domain(rule.column_index),
                header,
            );
            if change.is_none() {
                debug!(
                    "No change for column {} towards {}",
                    rule.column_index, rule.desired_domain_id
                );
            }
            change
        })
        .collect()
}

/// Record applied corrections on the copy target
pub fn apply(target: &mut CopyTarget, changes: &[DomainChange]) {
    for change in changes {
        target.set_domain(change.column_index, &change.domain_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MetadataInfo;

    fn candidate(id: &str, score: f32) -> SemanticCandidate {
        SemanticCandidate::new(id, format!("{} label", id), score)
    }

    fn record(domains: &[&str], candidates: Vec<Vec<SemanticCandidate>>) -> ProcessingRecord {
        ProcessingRecord::new(vec!["ds-1".into()])
            .with_metadata(MetadataInfo::new("[name, city]", ","))
            .with_copy_target(CopyTarget::new(
                domains.iter().map(|d| d.to_string()).collect(),
                candidates,
            ))
    }

    #[test]
    fn test_first_match_wins() {
        let rule = DomainChangeRule::new(0, "Y");
        let candidates = vec![candidate("Z", 0.95), candidate("Y", 0.9), candidate("Y", 0.4)];

        let change = decide(&rule, &candidates, Some("X"), "name").unwrap();
        assert_eq!(change.domain_id, "Y");
        assert_eq!(change.score, 0.9);
        assert_eq!(change.header, "name");
        assert_eq!(change.label, "Y label");
    }

    #[test]
    fn test_already_assigned_is_noop() {
        let rule = DomainChangeRule::new(0, "Y");
        let candidates = vec![candidate("Y", 0.9)];
        assert!(decide(&rule, &candidates, Some("Y"), "name").is_none());
    }

    #[test]
    fn test_no_matching_candidate() {
        let rule = DomainChangeRule::new(0, "Y");
        assert!(decide(&rule, &[candidate("X", 1.0)], None, "").is_none());
    }

    #[test]
    fn test_plan_follows_rule_order() {
        let rec = record(
            &["A", "B"],
            vec![vec![candidate("C", 0.5)], vec![candidate("D", 0.7)]],
        );
        let rules = vec![DomainChangeRule::new(1, "D"), DomainChangeRule::new(0, "C")];

        let changes = plan(&rules, &rec);
        let columns: Vec<usize> = changes.iter().map(|c| c.column_index).collect();
        assert_eq!(columns, vec![1, 0]);
        assert_eq!(changes[0].header, "city");
    }

    #[test]
    fn test_plan_skips_out_of_range_column() {
        let rec = record(&["A"], vec![vec![candidate("C", 0.5)]]);
        let rules = vec![DomainChangeRule::new(4, "C"), DomainChangeRule::new(0, "C")];
        assert_eq!(plan(&rules, &rec).len(), 1);
    }

    #[test]
    fn test_plan_missing_header_is_empty() {
        let mut rec = record(&["A"], vec![vec![candidate("C", 0.5)]]);
        rec.metadata = None;
        let changes = plan(&[DomainChangeRule::new(0, "C")], &rec);
        assert_eq!(changes[0].header, "");
    }

    #[test]
    fn test_apply_then_replan_is_noop() {
        let mut rec = record(&["X"], vec![vec![candidate("Y", 0.9), candidate("X", 0.5)]]);
        let rules = vec![DomainChangeRule::new(0, "Y")];

        let changes = plan(&rules, &rec);
        assert_eq!(changes.len(), 1);
        apply(rec.copy_target.as_mut().unwrap(), &changes);

        assert_eq!(rec.copy_target.as_ref().unwrap().column_domains, vec!["Y"]);
        assert!(plan(&rules, &rec).is_empty());
    }
}
