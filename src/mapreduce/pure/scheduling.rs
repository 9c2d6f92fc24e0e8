//! Pure task-selection rules for the coordinator
//!
//! [`next_assignment`] looks at both status tables and decides what the next
//! `request_task` call should hand out, without mutating anything. The
//! coordinator applies the decision with [`apply_assignment`] while it still
//! holds the task-store lock.
//!
//! Priority order:
//!
//! 1. an idle map task
//! 2. a map task whose lease expired (straggler)
//! 3. nothing, while any map task is not done (phase barrier)
//! 4. an idle reduce task
//! 5. a reduce task whose lease expired
//! 6. nothing

use crate::config::SchedulerConfig;
use crate::mapreduce::types::{TaskKind, TaskState, TaskStatus};
use std::time::Duration;
use tokio::time::Instant;

/// Why a task is being handed out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentReason {
    /// First hand-out of an idle task
    Fresh,
    /// Lease expired, task goes to whoever asks next
    Reassigned,
}

/// A scheduling decision for one task index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub kind: TaskKind,
    pub index: usize,
    pub reason: AssignmentReason,
}

/// Overall phase of a job derived from its status tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum JobPhase {
    Map,
    Reduce,
    Complete,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Map => write!(f, "Map"),
            JobPhase::Reduce => write!(f, "Reduce"),
            JobPhase::Complete => write!(f, "Complete"),
        }
    }
}

/// Whether every status in the table is done (vacuously true when empty)
pub fn all_done(statuses: &[TaskStatus]) -> bool {
    statuses.iter().all(TaskStatus::is_done)
}

/// Which phase the job is in
pub fn current_phase(map: &[TaskStatus], reduce: &[TaskStatus]) -> JobPhase {
    if !all_done(map) {
        JobPhase::Map
    } else if !all_done(reduce) {
        JobPhase::Reduce
    } else {
        JobPhase::Complete
    }
}

fn first_idle(statuses: &[TaskStatus]) -> Option<usize> {
    statuses.iter().position(|s| s.state == TaskState::Idle)
}

fn first_expired(statuses: &[TaskStatus], now: Instant, timeout: Duration) -> Option<usize> {
    statuses.iter().position(|s| s.is_expired(now, timeout))
}

fn pick(
    kind: TaskKind,
    statuses: &[TaskStatus],
    now: Instant,
    timeout: Duration,
) -> Option<Assignment> {
    if let Some(index) = first_idle(statuses) {
        return Some(Assignment {
            kind,
            index,
            reason: AssignmentReason::Fresh,
        });
    }
    first_expired(statuses, now, timeout).map(|index| Assignment {
        kind,
        index,
        reason: AssignmentReason::Reassigned,
    })
}

/// Decide what to hand out next, or `None` when the caller should wait
pub fn next_assignment(
    map: &[TaskStatus],
    reduce: &[TaskStatus],
    now: Instant,
    config: &SchedulerConfig,
) -> Option<Assignment> {
    if let Some(assignment) = pick(TaskKind::Map, map, now, config.map_timeout) {
        return Some(assignment);
    }
    if !all_done(map) {
        return None;
    }
    pick(TaskKind::Reduce, reduce, now, config.reduce_timeout)
}

/// Record an assignment on its status entry and return the new attempt
///
/// Both fresh and reassigned tasks end up in progress with a new lease
/// starting at `now`.
pub fn apply_assignment(status: &mut TaskStatus, now: Instant) -> u32 {
    status.state = TaskState::InProgress;
    status.assigned_at = Some(now);
    status.attempt += 1;
    status.attempt
}

/// Whether a report for `attempt` should be applied to `status`
///
/// Without fencing every report is accepted, including late duplicates.
/// With fencing, only the attempt currently holding the task may report.
pub fn accepts_report(status: &TaskStatus, attempt: u32, fence: bool) -> bool {
    if !fence {
        return true;
    }
    status.state == TaskState::InProgress && status.attempt == attempt
}
