//! Structured error types for the MapReduce engine
//!
//! Scheduling itself never fails: `request_task` always hands back a task,
//! possibly a `None` task. These errors cover the fallible edges around it,
//! such as construction, configuration loading, out-of-range reports and
//! worker joins.

use std::path::PathBuf;
use thiserror::Error;

use crate::mapreduce::TaskKind;

/// Main error type for MapReduce operations
#[derive(Debug, Error)]
pub enum MapReduceError {
    #[error("Invalid MapReduce configuration: {reason}")]
    InvalidConfiguration {
        reason: String,
        field: String,
        value: String,
    },

    #[error("{kind} task {task_id} does not exist (job has {available} {kind} tasks)")]
    UnknownTask {
        kind: TaskKind,
        task_id: usize,
        available: usize,
    },

    #[error("Failed to read configuration from {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration {path}: {reason}")]
    ConfigParse {
        path: PathBuf,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to load input records from {path}")]
    InputLoadFailed {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Worker {worker_id} terminated abnormally")]
    WorkerPanicked {
        worker_id: usize,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("Job ended with {pending_map} map and {pending_reduce} reduce tasks pending")]
    JobIncomplete {
        pending_map: usize,
        pending_reduce: usize,
    },
}

impl MapReduceError {
    /// Shorthand for configuration validation failures
    pub fn invalid_config(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        MapReduceError::InvalidConfiguration {
            reason: reason.into(),
            field: field.into(),
            value: value.to_string(),
        }
    }
}

/// Result type for MapReduce operations
pub type MapReduceResult<T> = Result<T, MapReduceError>;
