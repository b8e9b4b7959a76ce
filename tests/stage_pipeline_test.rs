//! End-to-end firings of the stage against the memory store and the mock
//! preparation service

mod common;

use common::*;
use std::time::Duration;

use prepsync::model::StageStatus;
use prepsync::preparation::{CleanupScope, MockPreparationService, PreparationCall, PreparationOp};
use prepsync::stage::{InterruptSignal, StageCoordinator, StageOutcome};
use prepsync::Error;

#[tokio::test]
async fn test_prune_replicate_and_correct_scenario() {
    let mock = MockPreparationService::new()
        .with_metadata(metadata("[email, city]"))
        .with_target("b", target(&["X"], vec![vec![candidate("Y", 0.9), candidate("X", 0.5)]]));
    let harness = Harness::new(mock, config_with_rules(&[(0, "Y")]));
    harness.assign(&[record("a"), record("b")]).await;

    let report = harness.coordinator.run(NODE).await.unwrap();
    assert_eq!(report.outcome, StageOutcome::Completed);
    assert_eq!(report.assigned, 2);
    assert_eq!(report.pruned, 1);
    assert_eq!(report.replicated, 1);
    assert_eq!(report.actions_submitted, 1);
    assert!(report.done_possible);

    // A deleted once, with the configured wait hint
    assert_eq!(
        harness.mock.calls_to(PreparationOp::DeleteDatasets),
        vec![PreparationCall::DeleteDatasets {
            dataset_ids: vec!["a".into()],
            wait_hint: Duration::from_millis(250),
        }]
    );

    let pruned = harness.node().load_pruned().await.unwrap().unwrap();
    assert_eq!(dataset_ids(&pruned), vec!["b"]);

    let submissions = harness.mock.calls_to(PreparationOp::ExecuteActions);
    assert_eq!(submissions.len(), 1);
    let PreparationCall::ExecuteActions {
        preparation_ids,
        batch,
    } = &submissions[0]
    else {
        panic!("unexpected call {:?}", submissions[0]);
    };
    assert_eq!(preparation_ids, &vec!["prep-b".to_string()]);
    assert_eq!(batch.len(), 1);
    let params = &batch.actions[0]["parameters"];
    assert_eq!(params["column_id"], "0000");
    assert_eq!(params["column_name"], "email");
    assert_eq!(params["new_domain_id"], "Y");
    assert_eq!(params["new_domain_frequency"], "0.9");

    let export = harness.node().load_export().await.unwrap().unwrap();
    assert_eq!(dataset_ids(&export), vec!["b"]);
    assert_eq!(
        export[0].copy_target.as_ref().unwrap().column_domains,
        vec!["Y"]
    );

    let state = harness.node().read_node_state().await.unwrap().unwrap();
    assert_eq!(state.stage(2), Some(StageStatus::Done));
    assert_eq!(state.stage(3), Some(StageStatus::Running));
    assert_eq!(state.stage(4), Some(StageStatus::New));
}

#[tokio::test]
async fn test_pruning_keeps_relative_order() {
    let mock = MockPreparationService::new()
        .with_target("a", target(&[], vec![]))
        .with_target("c", target(&[], vec![]))
        .with_target("e", target(&[], vec![]));
    let harness = Harness::new(mock, config_with_rules(&[]));
    harness
        .assign(&[record("a"), record("b"), record("c"), record("d"), record("e")])
        .await;

    let report = harness.coordinator.run(NODE).await.unwrap();
    assert_eq!(report.pruned, 2);
    assert_eq!(harness.mock.count(PreparationOp::DeleteDatasets), 2);

    let pruned = harness.node().load_pruned().await.unwrap().unwrap();
    assert_eq!(dataset_ids(&pruned), vec!["a", "c", "e"]);

    let export = harness.node().load_export().await.unwrap().unwrap();
    assert_eq!(dataset_ids(&export), vec!["a", "c", "e"]);
}

#[tokio::test]
async fn test_nothing_pruned_leaves_pruned_key_unset() {
    let mock = MockPreparationService::new().with_target("a", target(&[], vec![]));
    let harness = Harness::new(mock, config_with_rules(&[]));
    harness.assign(&[record("a")]).await;

    harness.coordinator.run(NODE).await.unwrap();
    assert!(harness.node().load_pruned().await.unwrap().is_none());
    assert_eq!(harness.mock.count(PreparationOp::DeleteDatasets), 0);
}

#[tokio::test]
async fn test_everything_pruned_terminates_once() {
    let harness = Harness::new(MockPreparationService::new(), config_with_rules(&[(0, "Y")]));
    harness.assign(&[record("a"), record("b")]).await;

    let report = harness.coordinator.run(NODE).await.unwrap();
    assert_eq!(report.outcome, StageOutcome::Terminated);
    assert_eq!(
        harness.mock.calls_to(PreparationOp::Cleanup),
        vec![PreparationCall::Cleanup {
            scope: CleanupScope::All
        }]
    );
    assert_eq!(harness.mock.count(PreparationOp::CopyPreparations), 0);
    assert_eq!(harness.mock.count(PreparationOp::ExecuteActions), 0);
    assert!(harness.node().load_export().await.unwrap().is_none());
}

#[tokio::test]
async fn test_empty_assignment_list_is_noop() {
    let harness = Harness::new(MockPreparationService::new(), config_with_rules(&[]));
    harness.assign(&[]).await;

    let report = harness.coordinator.run(NODE).await.unwrap();
    assert_eq!(report.outcome, StageOutcome::NoAssignments);
    assert!(harness.mock.calls().is_empty());
}

#[tokio::test]
async fn test_rerun_on_corrected_records_submits_nothing() {
    let mock = MockPreparationService::new();
    let harness = Harness::new(mock, config_with_rules(&[(0, "Y")]));
    let assigned = record("b")
        .with_metadata(metadata("[email]"))
        .with_copy_target(target(&["X"], vec![vec![candidate("Y", 0.9), candidate("X", 0.5)]]));
    harness.assign(&[assigned]).await;

    let first = harness.coordinator.run(NODE).await.unwrap();
    assert_eq!(first.actions_submitted, 1);
    let exported = harness.node().load_export().await.unwrap().unwrap();

    // Next firing starts from the corrected state
    harness.mock.reset();
    harness.assign(&exported).await;
    let second = harness.coordinator.run(NODE).await.unwrap();
    assert_eq!(second.actions_submitted, 0);
    assert_eq!(harness.mock.count(PreparationOp::ExecuteActions), 0);

    let reexported = harness.node().load_export().await.unwrap().unwrap();
    assert_eq!(
        reexported[0].copy_target.as_ref().unwrap().column_domains,
        exported[0].copy_target.as_ref().unwrap().column_domains
    );
}

#[tokio::test]
async fn test_first_matching_candidate_wins() {
    let mock = MockPreparationService::new().with_target(
        "b",
        target(&["X"], vec![vec![candidate("Z", 0.99), candidate("Y", 0.8), candidate("Y", 0.3)]]),
    );
    let harness = Harness::new(mock, config_with_rules(&[(0, "Y")]));
    harness.assign(&[record("b")]).await;

    harness.coordinator.run(NODE).await.unwrap();
    let submissions = harness.mock.calls_to(PreparationOp::ExecuteActions);
    let PreparationCall::ExecuteActions { batch, .. } = &submissions[0] else {
        panic!("expected an action submission");
    };
    assert_eq!(batch.len(), 1);
    assert_eq!(batch.actions[0]["parameters"]["new_domain_frequency"], "0.8");
}

#[tokio::test]
async fn test_already_correct_domain_is_noop() {
    let mock = MockPreparationService::new()
        .with_target("b", target(&["Y"], vec![vec![candidate("Y", 0.9)]]));
    let harness = Harness::new(mock, config_with_rules(&[(0, "Y")]));
    harness.assign(&[record("b")]).await;

    let report = harness.coordinator.run(NODE).await.unwrap();
    assert_eq!(report.actions_submitted, 0);
    assert_eq!(harness.mock.count(PreparationOp::ExecuteActions), 0);
    assert!(report.done_possible);
}

#[tokio::test]
async fn test_multiple_rules_share_one_batch() {
    let mock = MockPreparationService::new().with_target(
        "b",
        target(
            &["X", "P"],
            vec![vec![candidate("Y", 0.9)], vec![candidate("Q", 1.0)]],
        ),
    );
    let harness = Harness::new(mock, config_with_rules(&[(1, "Q"), (0, "Y")]));
    harness.assign(&[record("b")]).await;

    let report = harness.coordinator.run(NODE).await.unwrap();
    assert_eq!(report.actions_submitted, 2);

    let submissions = harness.mock.calls_to(PreparationOp::ExecuteActions);
    assert_eq!(submissions.len(), 1);
    let PreparationCall::ExecuteActions { batch, .. } = &submissions[0] else {
        panic!("expected an action submission");
    };
    assert_eq!(batch.actions[0]["parameters"]["column_id"], "0001");
    assert_eq!(batch.actions[0]["parameters"]["new_domain_frequency"], "1.0");
    assert_eq!(batch.actions[1]["parameters"]["column_id"], "0000");
}

#[tokio::test]
async fn test_copy_failure_aborts_firing() {
    let mock = MockPreparationService::new()
        .with_target("b", target(&[], vec![]))
        .fail_on(PreparationOp::CopyPreparations);
    let harness = Harness::new(mock, config_with_rules(&[]));
    harness.assign(&[record("b")]).await;

    let err = harness.coordinator.run(NODE).await.unwrap_err();
    assert!(matches!(err, Error::Preparation(_)));
    assert!(err.is_retryable());
    assert!(harness.node().load_export().await.unwrap().is_none());
}

#[tokio::test]
async fn test_enrichment_failure_aborts_before_pruning() {
    let mock = MockPreparationService::new().fail_on(PreparationOp::IncludeCopyTarget);
    let harness = Harness::new(mock, config_with_rules(&[]));
    harness.assign(&[record("a")]).await;

    assert!(harness.coordinator.run(NODE).await.is_err());
    assert_eq!(harness.mock.count(PreparationOp::DeleteDatasets), 0);
}

#[tokio::test]
async fn test_failed_deletion_does_not_abort() {
    let mock = MockPreparationService::new()
        .with_target("b", target(&[], vec![]))
        .fail_on(PreparationOp::DeleteDatasets);
    let harness = Harness::new(mock, config_with_rules(&[]));
    harness.assign(&[record("a"), record("b")]).await;

    let report = harness.coordinator.run(NODE).await.unwrap();
    assert_eq!(report.outcome, StageOutcome::Completed);
    assert_eq!(report.failed_deletions, 1);

    let pruned = harness.node().load_pruned().await.unwrap().unwrap();
    assert_eq!(dataset_ids(&pruned), vec!["b"]);
}

#[tokio::test]
async fn test_cleanup_failure_is_reported() {
    let mock = MockPreparationService::new().fail_on(PreparationOp::Cleanup);
    let harness = Harness::new(mock, config_with_rules(&[]));
    harness.assign(&[record("a")]).await;

    assert!(harness.coordinator.run(NODE).await.is_err());
}

#[tokio::test]
async fn test_interrupt_shortens_settle_delays() {
    let mock = MockPreparationService::new();
    let mut config = config_with_rules(&[]);
    config.settle_delay = Duration::from_secs(30);

    let backend = prepsync::storage::MemoryBackend::new();
    let interrupt = InterruptSignal::new();
    let coordinator = StageCoordinator::new(
        std::sync::Arc::new(backend),
        std::sync::Arc::new(mock.clone()),
        config,
    )
    .unwrap()
    .with_interrupt(interrupt.clone());
    coordinator
        .node_store(NODE)
        .save_assignments(&[record("a"), record("b")])
        .await
        .unwrap();

    interrupt.trigger();
    let report = tokio::time::timeout(Duration::from_secs(5), coordinator.run(NODE))
        .await
        .expect("interrupted firing should not wait out the settle delay")
        .unwrap();

    // Both deletions still ran
    assert_eq!(mock.count(PreparationOp::DeleteDatasets), 2);
    assert_eq!(report.outcome, StageOutcome::Terminated);
}

#[tokio::test]
async fn test_key_prefix_applies_to_every_key() {
    let mock = MockPreparationService::new().with_target("b", target(&[], vec![]));
    let mut config = config_with_rules(&[]);
    config.store.key_prefix = "dprep:".into();
    let harness = Harness::new(mock, config);
    harness.assign(&[record("b")]).await;

    harness.coordinator.run(NODE).await.unwrap();
    let keys = harness.backend.keys().await;
    assert!(keys.contains(&"dprep:JOB_STATUS_NODE_1".to_string()));
    assert!(keys.contains(&"dprep:LIST_OF_EXPORT_1".to_string()));
    assert!(keys.iter().all(|k| k.starts_with("dprep:")));
}
