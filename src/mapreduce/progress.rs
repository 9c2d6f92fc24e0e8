//! Progress snapshots for a running job

use super::pure::scheduling::JobPhase;
use super::types::{TaskState, TaskStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task counts for one phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCounts {
    pub idle: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl PhaseCounts {
    pub fn from_statuses(statuses: &[TaskStatus]) -> Self {
        statuses
            .iter()
            .fold(PhaseCounts::default(), |mut counts, status| {
                match status.state {
                    TaskState::Idle => counts.idle += 1,
                    TaskState::InProgress => counts.in_progress += 1,
                    TaskState::Done => counts.done += 1,
                }
                counts
            })
    }

    pub fn total(&self) -> usize {
        self.idle + self.in_progress + self.done
    }

    pub fn pending(&self) -> usize {
        self.idle + self.in_progress
    }
}

/// Point-in-time view of a job's scheduling state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub phase: JobPhase,
    pub map: PhaseCounts,
    pub reduce: PhaseCounts,
    /// Leases handed out again after expiring
    pub reassignments: u64,
    /// Accepted reports for tasks that were already done
    pub duplicate_reports: u64,
    /// Reports rejected by attempt fencing
    pub stale_reports: u64,
}

impl JobProgress {
    /// Share of all tasks that are done, 0.0 to 100.0
    pub fn percent_complete(&self) -> f64 {
        let total = self.map.total() + self.reduce.total();
        if total == 0 {
            return 100.0;
        }
        ((self.map.done + self.reduce.done) as f64 / total as f64) * 100.0
    }
}

impl fmt::Display for JobProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} phase: map {}/{} done, reduce {}/{} done, {} reassigned",
            self.phase,
            self.map.done,
            self.map.total(),
            self.reduce.done,
            self.reduce.total(),
            self.reassignments
        )
    }
}
