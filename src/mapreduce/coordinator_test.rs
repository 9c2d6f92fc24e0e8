//! Unit tests for the coordinator

use super::*;
use crate::config::SchedulerConfig;
use crate::error::MapReduceError;
use std::sync::Arc;
use std::time::Duration;

fn inputs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn single_partition(reduce: usize, pairs: &[(&str, &str)]) -> Partitions {
    let mut partitions = Partitions::new();
    partitions.insert(
        reduce,
        pairs.iter().map(|(k, v)| KeyValue::new(*k, *v)).collect(),
    );
    partitions
}

#[tokio::test]
async fn test_empty_job_is_complete_immediately() {
    let coordinator = Coordinator::new(vec![], 0).unwrap();
    assert!(coordinator.is_complete().await);
    assert!(coordinator.request_task().await.is_none());
    assert_eq!(coordinator.progress().await.phase, JobPhase::Complete);
}

#[tokio::test]
async fn test_inputs_without_partitions_are_rejected() {
    let err = Coordinator::new(inputs(&["a"]), 0).unwrap_err();
    assert!(matches!(
        err,
        MapReduceError::InvalidConfiguration { field, .. } if field == "num_reduce"
    ));
}

#[tokio::test]
async fn test_map_tasks_handed_out_in_index_order() {
    let coordinator = Coordinator::new(inputs(&["first", "second"]), 1).unwrap();

    let t0 = coordinator.request_task().await;
    let t1 = coordinator.request_task().await;
    assert_eq!(
        (t0.kind, t0.id, t0.input_data.as_str()),
        (TaskKind::Map, 0, "first")
    );
    assert_eq!(
        (t1.kind, t1.id, t1.input_data.as_str()),
        (TaskKind::Map, 1, "second")
    );
    assert!(coordinator.request_task().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_phase_barrier_holds_while_map_in_flight() {
    let coordinator = Coordinator::new(inputs(&["a", "b"]), 2).unwrap();

    let first = coordinator.request_task().await;
    let held = coordinator.request_task().await;
    coordinator
        .report_map_success(first.id, first.attempt, Partitions::new())
        .await
        .unwrap();

    // `held` never reports; only map or none tasks may come back
    for _ in 0..40 {
        let task = coordinator.request_task().await;
        assert_ne!(task.kind, TaskKind::Reduce);
        if task.kind == TaskKind::Map {
            assert_eq!(task.id, held.id);
        }
        tokio::time::advance(Duration::from_millis(500)).await;
    }
    assert!(!coordinator.is_complete().await);
}

#[tokio::test(start_paused = true)]
async fn test_straggler_map_task_is_reassigned_after_timeout() {
    let coordinator = Coordinator::new(inputs(&["a"]), 1).unwrap();
    let original = coordinator.request_task().await;
    assert_eq!(original.attempt, 1);

    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(coordinator.request_task().await.is_none());

    tokio::time::advance(Duration::from_millis(1)).await;
    let again = coordinator.request_task().await;
    assert_eq!(again.kind, TaskKind::Map);
    assert_eq!(again.id, original.id);
    assert_eq!(again.input_data, original.input_data);
    assert_eq!(again.attempt, 2);

    // Lease was refreshed, so it is not handed out a third time right away
    assert!(coordinator.request_task().await.is_none());
    let progress = coordinator.progress().await;
    assert_eq!(progress.reassignments, 1);
    assert_eq!(progress.map.in_progress, 1);
}

#[tokio::test(start_paused = true)]
async fn test_straggler_reduce_task_uses_reduce_timeout() {
    let coordinator = Coordinator::new(vec![], 1).unwrap();
    let reduce = coordinator.request_task().await;
    assert_eq!(reduce.kind, TaskKind::Reduce);

    tokio::time::advance(Duration::from_secs(6)).await;
    assert!(coordinator.request_task().await.is_none());

    tokio::time::advance(Duration::from_secs(5)).await;
    let again = coordinator.request_task().await;
    assert_eq!(
        (again.kind, again.id, again.attempt),
        (TaskKind::Reduce, 0, 2)
    );
}

#[tokio::test]
async fn test_completion_detection() {
    let coordinator = Coordinator::new(inputs(&["a"]), 2).unwrap();

    let map = coordinator.request_task().await;
    assert!(!coordinator.is_complete().await);
    coordinator
        .report_map_success(map.id, map.attempt, single_partition(0, &[("k", "v")]))
        .await
        .unwrap();
    assert!(!coordinator.is_complete().await);

    let r0 = coordinator.request_task().await;
    let r1 = coordinator.request_task().await;
    assert_eq!((r0.kind, r0.id), (TaskKind::Reduce, 0));
    assert_eq!((r1.kind, r1.id), (TaskKind::Reduce, 1));

    coordinator
        .report_reduce_success(r0.id, r0.attempt, "k 1".to_string())
        .await
        .unwrap();
    assert!(!coordinator.is_complete().await);
    coordinator
        .report_reduce_success(r1.id, r1.attempt, String::new())
        .await
        .unwrap();
    assert!(coordinator.is_complete().await);

    assert!(coordinator.request_task().await.is_none());
    assert!(coordinator.is_complete().await);
    assert_eq!(
        coordinator.outputs().await,
        vec!["k 1".to_string(), String::new()]
    );
}

#[tokio::test]
async fn test_empty_inputs_single_partition_produces_empty_blob() {
    let coordinator = Coordinator::new(vec![], 1).unwrap();
    assert!(!coordinator.is_complete().await);

    let task = coordinator.request_task().await;
    assert_eq!(task.kind, TaskKind::Reduce);
    assert!(coordinator.reduce_partition(task.id).await.unwrap().is_empty());

    coordinator
        .report_reduce_success(task.id, task.attempt, String::new())
        .await
        .unwrap();
    assert!(coordinator.is_complete().await);
    assert_eq!(coordinator.output(0).await, "");
}

#[tokio::test]
async fn test_duplicate_map_report_double_appends_without_fencing() {
    let coordinator = Coordinator::new(inputs(&["a"]), 1).unwrap();
    let task = coordinator.request_task().await;
    let partitions = single_partition(0, &[("drama", "A:4.5")]);

    let first = coordinator
        .report_map_success(task.id, task.attempt, partitions.clone())
        .await
        .unwrap();
    let second = coordinator
        .report_map_success(task.id, task.attempt, partitions)
        .await
        .unwrap();

    assert_eq!(first, ReportOutcome::Accepted);
    assert_eq!(second, ReportOutcome::Duplicate);
    let partition = coordinator.reduce_partition(0).await.unwrap();
    assert_eq!(partition["drama"], vec!["A:4.5", "A:4.5"]);
    assert_eq!(coordinator.progress().await.duplicate_reports, 1);
}

#[tokio::test(start_paused = true)]
async fn test_fencing_drops_report_from_superseded_attempt() {
    let config = SchedulerConfig {
        fence_stale_reports: true,
        ..SchedulerConfig::default()
    };
    let coordinator = Coordinator::with_config(inputs(&["a"]), 1, config).unwrap();

    let original = coordinator.request_task().await;
    tokio::time::advance(Duration::from_secs(6)).await;
    let retry = coordinator.request_task().await;
    assert_eq!(retry.attempt, original.attempt + 1);

    let partitions = single_partition(0, &[("drama", "A:4.5")]);
    let late = coordinator
        .report_map_success(original.id, original.attempt, partitions.clone())
        .await
        .unwrap();
    let current = coordinator
        .report_map_success(retry.id, retry.attempt, partitions.clone())
        .await
        .unwrap();
    let repeat = coordinator
        .report_map_success(retry.id, retry.attempt, partitions)
        .await
        .unwrap();

    assert_eq!(late, ReportOutcome::Stale);
    assert_eq!(current, ReportOutcome::Accepted);
    assert_eq!(repeat, ReportOutcome::Stale);
    let partition = coordinator.reduce_partition(0).await.unwrap();
    assert_eq!(partition["drama"], vec!["A:4.5"]);
    assert_eq!(coordinator.progress().await.stale_reports, 2);
}

#[tokio::test]
async fn test_reduce_partition_is_a_snapshot() {
    let coordinator = Coordinator::new(inputs(&["a", "b"]), 1).unwrap();
    let a = coordinator.request_task().await;
    let b = coordinator.request_task().await;

    coordinator
        .report_map_success(a.id, a.attempt, single_partition(0, &[("k", "1")]))
        .await
        .unwrap();
    let snapshot = coordinator.reduce_partition(0).await.unwrap();

    coordinator
        .report_map_success(b.id, b.attempt, single_partition(0, &[("k", "2")]))
        .await
        .unwrap();

    assert_eq!(snapshot["k"], vec!["1"]);
    assert_eq!(coordinator.reduce_partition(0).await.unwrap()["k"].len(), 2);
}

#[tokio::test]
async fn test_reports_for_unknown_tasks_fail() {
    let coordinator = Coordinator::new(inputs(&["a"]), 1).unwrap();

    assert!(matches!(
        coordinator
            .report_map_success(5, 1, Partitions::new())
            .await,
        Err(MapReduceError::UnknownTask {
            kind: TaskKind::Map,
            task_id: 5,
            ..
        })
    ));
    assert!(coordinator
        .report_reduce_success(1, 1, String::new())
        .await
        .is_err());
    assert!(coordinator.reduce_partition(1).await.is_err());

    // A bad partition index stores nothing and leaves the task pending
    let task = coordinator.request_task().await;
    assert!(coordinator
        .report_map_success(task.id, task.attempt, single_partition(3, &[("k", "v")]))
        .await
        .is_err());
    assert_eq!(coordinator.progress().await.map.in_progress, 1);
}

#[tokio::test]
async fn test_status_change_wakes_waiters() {
    let coordinator = Arc::new(Coordinator::new(inputs(&["a"]), 1).unwrap());
    let task = coordinator.request_task().await;
    let notified = coordinator.notified();

    let reporter = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            coordinator
                .report_map_success(task.id, task.attempt, Partitions::new())
                .await
        })
    };

    tokio::time::timeout(Duration::from_secs(5), notified)
        .await
        .expect("status change should notify");
    assert_eq!(reporter.await.unwrap().unwrap(), ReportOutcome::Accepted);
}
