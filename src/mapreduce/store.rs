//! The coordinator's three state regions
//!
//! Each store is plain data; the coordinator puts each one behind its own
//! lock and never holds two of those locks at once.

use super::progress::{JobProgress, PhaseCounts};
use super::pure::scheduling::{
    accepts_report, all_done, apply_assignment, current_phase, next_assignment, Assignment,
    AssignmentReason,
};
use super::types::{Partitions, Task, TaskKind, TaskState, TaskStatus};
use crate::config::SchedulerConfig;
use crate::error::{MapReduceError, MapReduceResult};
use std::collections::{HashMap, HashSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of a success report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// First report for the task; results were stored
    Accepted,
    /// The task was already done; results were stored again
    Duplicate,
    /// Rejected by attempt fencing; nothing was stored
    Stale,
}

/// Per-task status tables for both phases
#[derive(Debug)]
pub struct TaskStore {
    inputs: Vec<String>,
    map: Vec<TaskStatus>,
    reduce: Vec<TaskStatus>,
    /// Fenced reports between their acceptance and their completion
    claims: HashSet<(TaskKind, usize)>,
    reassignments: u64,
    duplicate_reports: u64,
    stale_reports: u64,
}

impl TaskStore {
    pub fn new(inputs: Vec<String>, num_reduce: usize) -> Self {
        let map = vec![TaskStatus::idle(); inputs.len()];
        Self {
            inputs,
            map,
            reduce: vec![TaskStatus::idle(); num_reduce],
            claims: HashSet::new(),
            reassignments: 0,
            duplicate_reports: 0,
            stale_reports: 0,
        }
    }

    pub fn statuses(&self, kind: TaskKind) -> &[TaskStatus] {
        match kind {
            TaskKind::Map => &self.map,
            TaskKind::Reduce => &self.reduce,
            TaskKind::None => &[],
        }
    }

    fn status_mut(&mut self, kind: TaskKind, id: usize) -> MapReduceResult<&mut TaskStatus> {
        let table = match kind {
            TaskKind::Map => &mut self.map,
            TaskKind::Reduce => &mut self.reduce,
            TaskKind::None => {
                return Err(MapReduceError::UnknownTask {
                    kind,
                    task_id: id,
                    available: 0,
                })
            }
        };
        let available = table.len();
        table.get_mut(id).ok_or(MapReduceError::UnknownTask {
            kind,
            task_id: id,
            available,
        })
    }

    /// Pick, record and build the next task to hand out
    pub fn assign(&mut self, now: Instant, config: &SchedulerConfig) -> Task {
        let Some(Assignment {
            kind,
            index,
            reason,
        }) = next_assignment(&self.map, &self.reduce, now, config)
        else {
            return Task::none();
        };

        let status = match kind {
            TaskKind::Map => &mut self.map[index],
            _ => &mut self.reduce[index],
        };
        let attempt = apply_assignment(status, now);

        if reason == AssignmentReason::Reassigned {
            self.reassignments += 1;
            warn!(
                "{} task {} timed out, reassigning (attempt {})",
                kind, index, attempt
            );
        } else {
            debug!("Assigning {} task {}", kind, index);
        }

        match kind {
            TaskKind::Map => Task::map(index, self.inputs[index].clone(), attempt),
            _ => Task::reduce(index, attempt),
        }
    }

    /// First half of a report: decide whether its results may be stored
    ///
    /// With fencing, an accepted report claims the task until
    /// [`TaskStore::finish_report`] so that no other attempt can slip in
    /// between storing results and marking the task done.
    pub fn begin_report(
        &mut self,
        kind: TaskKind,
        id: usize,
        attempt: u32,
        fence: bool,
    ) -> MapReduceResult<bool> {
        let status = self.status_mut(kind, id)?;
        if !fence {
            return Ok(true);
        }

        let current = status.attempt;
        if !accepts_report(status, attempt, fence) || self.claims.contains(&(kind, id)) {
            self.stale_reports += 1;
            debug!(
                "Ignoring stale report for {} task {} (attempt {}, current {})",
                kind, id, attempt, current
            );
            return Ok(false);
        }
        self.claims.insert((kind, id));
        Ok(true)
    }

    /// Drop a claim taken by [`TaskStore::begin_report`] whose results could
    /// not be stored
    pub fn release_claim(&mut self, kind: TaskKind, id: usize) {
        self.claims.remove(&(kind, id));
    }

    /// Second half of a report: mark the task done
    pub fn finish_report(&mut self, kind: TaskKind, id: usize) -> MapReduceResult<ReportOutcome> {
        let status = self.status_mut(kind, id)?;
        let was_done = status.is_done();
        status.state = TaskState::Done;
        self.claims.remove(&(kind, id));

        if was_done {
            self.duplicate_reports += 1;
            warn!("{} task {} reported done more than once", kind, id);
            return Ok(ReportOutcome::Duplicate);
        }

        if kind == TaskKind::Map && all_done(&self.map) {
            info!(
                "All {} map tasks complete, reduce phase unlocked",
                self.map.len()
            );
        } else if kind == TaskKind::Reduce && self.is_complete() {
            info!("All {} reduce tasks complete", self.reduce.len());
        }
        Ok(ReportOutcome::Accepted)
    }

    pub fn is_complete(&self) -> bool {
        all_done(&self.map) && all_done(&self.reduce)
    }

    pub fn progress(&self) -> JobProgress {
        JobProgress {
            phase: current_phase(&self.map, &self.reduce),
            map: PhaseCounts::from_statuses(&self.map),
            reduce: PhaseCounts::from_statuses(&self.reduce),
            reassignments: self.reassignments,
            duplicate_reports: self.duplicate_reports,
            stale_reports: self.stale_reports,
        }
    }
}

/// Map output grouped by reduce partition, then by key
#[derive(Debug, Default)]
pub struct IntermediateStore {
    partitions: Vec<HashMap<String, Vec<String>>>,
}

impl IntermediateStore {
    pub fn new(num_reduce: usize) -> Self {
        Self {
            partitions: vec![HashMap::new(); num_reduce],
        }
    }

    /// Append every pair to its partition; returns how many were appended
    ///
    /// Partition indices are checked up front so a bad report appends nothing.
    pub fn append(&mut self, partitions: Partitions) -> MapReduceResult<usize> {
        let available = self.partitions.len();
        if let Some(&bad) = partitions.keys().find(|&&reduce| reduce >= available) {
            return Err(MapReduceError::UnknownTask {
                kind: TaskKind::Reduce,
                task_id: bad,
                available,
            });
        }

        let mut appended = 0;
        for (reduce, pairs) in partitions {
            let bucket = &mut self.partitions[reduce];
            for kv in pairs {
                bucket.entry(kv.key).or_default().push(kv.value);
                appended += 1;
            }
        }
        Ok(appended)
    }

    /// Independent copy of one partition
    pub fn snapshot(&self, reduce_id: usize) -> MapReduceResult<HashMap<String, Vec<String>>> {
        self.partitions
            .get(reduce_id)
            .cloned()
            .ok_or(MapReduceError::UnknownTask {
                kind: TaskKind::Reduce,
                task_id: reduce_id,
                available: self.partitions.len(),
            })
    }
}

/// Final blob per reduce partition
#[derive(Debug, Default)]
pub struct OutputStore {
    num_reduce: usize,
    outputs: HashMap<usize, String>,
}

impl OutputStore {
    pub fn new(num_reduce: usize) -> Self {
        Self {
            num_reduce,
            outputs: HashMap::new(),
        }
    }

    /// Store a partition's blob; returns true if it replaced an earlier one
    pub fn store(&mut self, reduce_id: usize, output: String) -> MapReduceResult<bool> {
        if reduce_id >= self.num_reduce {
            return Err(MapReduceError::UnknownTask {
                kind: TaskKind::Reduce,
                task_id: reduce_id,
                available: self.num_reduce,
            });
        }
        Ok(self.outputs.insert(reduce_id, output).is_some())
    }

    /// Blob for one partition, empty if it was never written
    pub fn get(&self, reduce_id: usize) -> String {
        self.outputs.get(&reduce_id).cloned().unwrap_or_default()
    }

    /// Every partition's blob in partition order
    pub fn all(&self) -> Vec<String> {
        (0..self.num_reduce).map(|id| self.get(id)).collect()
    }
}
