//! Core data types shared by the coordinator and its workers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

/// A single intermediate key/value pair emitted by a map function
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// User-supplied map function: `(document_id, input) -> pairs`
///
/// Must be safe to call concurrently on different inputs and must not touch
/// shared state.
pub type MapFn = Arc<dyn Fn(&str, &str) -> Vec<KeyValue> + Send + Sync>;

/// User-supplied reduce function: `(key, values) -> aggregated result`
pub type ReduceFn = Arc<dyn Fn(&str, &[String]) -> String + Send + Sync>;

/// Map output bucketed by reduce partition index
pub type Partitions = HashMap<usize, Vec<KeyValue>>;

/// Kind of work carried by a [`Task`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Map,
    Reduce,
    /// Nothing to hand out right now; the caller should wait and poll again
    None,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Map => write!(f, "Map"),
            TaskKind::Reduce => write!(f, "Reduce"),
            TaskKind::None => write!(f, "None"),
        }
    }
}

/// One unit of work as handed to a worker
///
/// Carries everything the worker needs, so executing it requires no further
/// lookups against the coordinator (reduce tasks still fetch their partition).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub kind: TaskKind,
    pub id: usize,
    pub chunk_index: usize,
    pub input_data: String,
    /// Assignment epoch: 1 on first hand-out, bumped on every reassignment
    pub attempt: u32,
}

impl Task {
    pub fn map(id: usize, input_data: impl Into<String>, attempt: u32) -> Self {
        Self {
            kind: TaskKind::Map,
            id,
            chunk_index: id,
            input_data: input_data.into(),
            attempt,
        }
    }

    pub fn reduce(id: usize, attempt: u32) -> Self {
        Self {
            kind: TaskKind::Reduce,
            id,
            chunk_index: id,
            input_data: String::new(),
            attempt,
        }
    }

    pub fn none() -> Self {
        Self {
            kind: TaskKind::None,
            id: 0,
            chunk_index: 0,
            input_data: String::new(),
            attempt: 0,
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == TaskKind::None
    }

    /// Document identifier passed to the map function
    pub fn document_id(&self) -> String {
        format!("doc-{}", self.chunk_index)
    }
}

/// Lifecycle state of a map or reduce task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    Idle,
    InProgress,
    Done,
}

/// Coordinator-side bookkeeping for one task index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub state: TaskState,
    pub assigned_at: Option<Instant>,
    pub attempt: u32,
}

impl TaskStatus {
    pub fn idle() -> Self {
        Self {
            state: TaskState::Idle,
            assigned_at: None,
            attempt: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == TaskState::Done
    }

    /// Whether an in-progress lease has outlived `timeout` at `now`
    pub fn is_expired(&self, now: Instant, timeout: std::time::Duration) -> bool {
        match (self.state, self.assigned_at) {
            (TaskState::InProgress, Some(at)) => now.saturating_duration_since(at) > timeout,
            _ => false,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::idle()
    }
}
