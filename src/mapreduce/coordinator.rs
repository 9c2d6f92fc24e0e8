//! Coordinator for a single MapReduce job
//!
//! The coordinator owns all job state and is the only place task status
//! changes. Workers pull tasks with [`Coordinator::request_task`] and push
//! results back with the `report_*` methods.
//!
//! # Locking
//!
//! Task statuses, intermediate data and final outputs sit behind three
//! independent locks that are never held together. A map report appends its
//! pairs under the intermediate lock first and only then marks the task done
//! under the task lock, so by the time the phase barrier opens every map
//! task's data is already stored.
//!
//! # Delivery guarantee
//!
//! Reassigning a straggler does not stop the original worker. Unless
//! [`SchedulerConfig::fence_stale_reports`] is set, both workers may report
//! success and the task's pairs are appended twice (at-least-once). With
//! fencing, only the report carrying the task's current attempt is stored.

use super::progress::JobProgress;
use super::store::{IntermediateStore, OutputStore, ReportOutcome, TaskStore};
use super::types::{Partitions, Task, TaskKind};
use crate::config::SchedulerConfig;
use crate::error::{MapReduceError, MapReduceResult};
use std::collections::HashMap;
use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, info};

/// Shared scheduler state for one computation
///
/// Created once per job and shared between workers through an `Arc`.
#[derive(Debug)]
pub struct Coordinator {
    num_map: usize,
    num_reduce: usize,
    config: SchedulerConfig,
    tasks: Mutex<TaskStore>,
    intermediate: Mutex<IntermediateStore>,
    outputs: Mutex<OutputStore>,
    changed: Notify,
}

impl Coordinator {
    /// Create a coordinator with default timeouts
    ///
    /// `inputs[i]` becomes the payload of map task `i`.
    pub fn new(inputs: Vec<String>, num_reduce: usize) -> MapReduceResult<Self> {
        Self::with_config(inputs, num_reduce, SchedulerConfig::default())
    }

    pub fn with_config(
        inputs: Vec<String>,
        num_reduce: usize,
        config: SchedulerConfig,
    ) -> MapReduceResult<Self> {
        config.validate()?;
        if num_reduce == 0 && !inputs.is_empty() {
            return Err(MapReduceError::invalid_config(
                "num_reduce",
                num_reduce,
                "map output needs at least one reduce partition",
            ));
        }

        let num_map = inputs.len();
        info!(
            "Creating coordinator with {} map tasks and {} reduce tasks",
            num_map, num_reduce
        );

        Ok(Self {
            num_map,
            num_reduce,
            config,
            tasks: Mutex::new(TaskStore::new(inputs, num_reduce)),
            intermediate: Mutex::new(IntermediateStore::new(num_reduce)),
            outputs: Mutex::new(OutputStore::new(num_reduce)),
            changed: Notify::new(),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn num_map(&self) -> usize {
        self.num_map
    }

    pub fn num_reduce(&self) -> usize {
        self.num_reduce
    }

    /// Hand out the next task, or a `None` task when there is nothing to do
    ///
    /// Never waits on other tasks: the decision is made under the task lock
    /// and returned immediately.
    pub async fn request_task(&self) -> Task {
        let now = Instant::now();
        let mut tasks = self.tasks.lock().await;
        tasks.assign(now, &self.config)
    }

    /// Store a map task's partitioned output and mark the task done
    pub async fn report_map_success(
        &self,
        map_id: usize,
        attempt: u32,
        partitions: Partitions,
    ) -> MapReduceResult<ReportOutcome> {
        let fence = self.config.fence_stale_reports;
        if !self
            .tasks
            .lock()
            .await
            .begin_report(TaskKind::Map, map_id, attempt, fence)?
        {
            return Ok(ReportOutcome::Stale);
        }

        let appended = self.intermediate.lock().await.append(partitions);
        let appended = match appended {
            Ok(count) => count,
            Err(err) => {
                self.tasks.lock().await.release_claim(TaskKind::Map, map_id);
                return Err(err);
            }
        };
        debug!(
            "Map task {} (attempt {}) stored {} pairs",
            map_id, attempt, appended
        );

        let outcome = self
            .tasks
            .lock()
            .await
            .finish_report(TaskKind::Map, map_id)?;
        self.changed.notify_waiters();
        Ok(outcome)
    }

    /// Store a reduce task's output blob and mark the task done
    pub async fn report_reduce_success(
        &self,
        reduce_id: usize,
        attempt: u32,
        output: String,
    ) -> MapReduceResult<ReportOutcome> {
        let fence = self.config.fence_stale_reports;
        if !self
            .tasks
            .lock()
            .await
            .begin_report(TaskKind::Reduce, reduce_id, attempt, fence)?
        {
            return Ok(ReportOutcome::Stale);
        }

        let stored = self.outputs.lock().await.store(reduce_id, output);
        if let Err(err) = stored {
            self.tasks
                .lock()
                .await
                .release_claim(TaskKind::Reduce, reduce_id);
            return Err(err);
        }

        let outcome = self
            .tasks
            .lock()
            .await
            .finish_report(TaskKind::Reduce, reduce_id)?;
        self.changed.notify_waiters();
        Ok(outcome)
    }

    /// Copy of one partition's key to values mapping
    ///
    /// The copy is detached from the store, so appends that land later are
    /// not visible through it.
    pub async fn reduce_partition(
        &self,
        reduce_id: usize,
    ) -> MapReduceResult<HashMap<String, Vec<String>>> {
        self.intermediate.lock().await.snapshot(reduce_id)
    }

    /// True once every map and reduce task is done; stays true afterwards
    pub async fn is_complete(&self) -> bool {
        self.tasks.lock().await.is_complete()
    }

    /// Final blob of one partition, empty if not produced (yet)
    pub async fn output(&self, reduce_id: usize) -> String {
        self.outputs.lock().await.get(reduce_id)
    }

    /// Every partition's blob in partition order
    pub async fn outputs(&self) -> Vec<String> {
        self.outputs.lock().await.all()
    }

    pub async fn progress(&self) -> JobProgress {
        self.tasks.lock().await.progress()
    }

    /// Future that resolves on the next task status change
    ///
    /// Create it before checking state to avoid missing a change that lands
    /// in between.
    pub fn notified(&self) -> Notified<'_> {
        self.changed.notified()
    }
}
