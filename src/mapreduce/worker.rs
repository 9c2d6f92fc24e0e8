//! Worker execution loop
//!
//! A worker repeatedly pulls a task from the coordinator, runs the matching
//! user function and reports the result. It exits once the coordinator
//! reports the whole job complete. Workers never talk to each other.

use super::coordinator::Coordinator;
use super::partition::partition_pairs;
use super::pure::aggregation::assemble_partition_output;
use super::store::ReportOutcome;
use super::types::{MapFn, ReduceFn, Task, TaskKind};
use crate::error::MapReduceResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// What a worker did over its lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub worker_id: usize,
    pub map_tasks: usize,
    pub reduce_tasks: usize,
    /// Times the worker was told to wait
    pub idle_polls: usize,
}

/// One worker loop bound to a coordinator and a pair of user functions
pub struct Worker {
    id: usize,
    coordinator: Arc<Coordinator>,
    map_fn: MapFn,
    reduce_fn: ReduceFn,
}

impl Worker {
    pub fn new(
        id: usize,
        coordinator: Arc<Coordinator>,
        map_fn: MapFn,
        reduce_fn: ReduceFn,
    ) -> Self {
        Self {
            id,
            coordinator,
            map_fn,
            reduce_fn,
        }
    }

    /// Run until the job is complete
    ///
    /// When told to wait, the worker sleeps until the next task status change
    /// or the poll interval, whichever comes first. The poll interval still
    /// matters because an expiring lease produces no change notification.
    pub async fn run(self) -> MapReduceResult<WorkerSummary> {
        let poll_interval = self.coordinator.config().poll_interval;
        let mut summary = WorkerSummary {
            worker_id: self.id,
            ..WorkerSummary::default()
        };
        debug!("Worker {} started", self.id);

        loop {
            let task = self.coordinator.request_task().await;
            match task.kind {
                TaskKind::Map => {
                    info!("Worker {}: got MAP task {}", self.id, task.id);
                    self.execute_map(&task).await?;
                    summary.map_tasks += 1;
                }
                TaskKind::Reduce => {
                    info!("Worker {}: got REDUCE task {}", self.id, task.id);
                    self.execute_reduce(&task).await?;
                    summary.reduce_tasks += 1;
                }
                TaskKind::None => {
                    let changed = self.coordinator.notified();
                    if self.coordinator.is_complete().await {
                        break;
                    }
                    summary.idle_polls += 1;
                    // Either outcome means "ask again"
                    let _ = tokio::time::timeout(poll_interval, changed).await;
                }
            }
        }

        debug!(
            "Worker {} exiting after {} map and {} reduce tasks",
            self.id, summary.map_tasks, summary.reduce_tasks
        );
        Ok(summary)
    }

    /// Run the map function over the task input and report bucketed output
    pub async fn execute_map(&self, task: &Task) -> MapReduceResult<ReportOutcome> {
        let pairs = (self.map_fn)(&task.document_id(), &task.input_data);
        let emitted = pairs.len();
        let partitions = partition_pairs(pairs, self.coordinator.num_reduce());
        debug!(
            "Worker {}: map task {} emitted {} pairs into {} partitions",
            self.id,
            task.id,
            emitted,
            partitions.len()
        );

        self.coordinator
            .report_map_success(task.id, task.attempt, partitions)
            .await
    }

    /// Reduce every key of the task's partition in sorted order and report
    /// the joined blob
    pub async fn execute_reduce(&self, task: &Task) -> MapReduceResult<ReportOutcome> {
        let partition = self.coordinator.reduce_partition(task.chunk_index).await?;
        let reduce_fn = &self.reduce_fn;
        let output = assemble_partition_output(&partition, |key, values| reduce_fn(key, values));
        debug!(
            "Worker {}: reduce task {} aggregated {} keys",
            self.id,
            task.id,
            partition.len()
        );

        self.coordinator
            .report_reduce_success(task.id, task.attempt, output)
            .await
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker").field("id", &self.id).finish()
    }
}
