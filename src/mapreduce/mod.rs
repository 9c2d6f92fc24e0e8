//! In-process MapReduce scheduling
//!
//! A [`Coordinator`] hands out map and reduce tasks to a pool of
//! [`Worker`] loops running as tokio tasks in the same process. Workers pull
//! work, run the user-supplied map or reduce function, and report results
//! back; the coordinator tracks every task's status and aggregates results.
//!
//! # Task lifecycle
//!
//! ```text
//!   ┌──────┐  request_task   ┌────────────┐  report_*_success  ┌──────┐
//!   │ Idle │ ──────────────> │ InProgress │ ─────────────────> │ Done │
//!   └──────┘                 └─────┬──────┘                    └──────┘
//!                                  │  ▲
//!                                  └──┘ lease expired: handed out again
//! ```
//!
//! Reduce tasks are only handed out once every map task is done. A key is
//! routed to reduce partition `ihash(key) % num_reduce` (see [`partition`]).
//!
//! # Example
//!
//! ```no_run
//! use mapreduce_engine::config::MapReduceConfig;
//! use mapreduce_engine::mapreduce::{KeyValue, MapReduceJob};
//!
//! # async fn run() -> mapreduce_engine::error::MapReduceResult<()> {
//! let job = MapReduceJob::from_fns(
//!     MapReduceConfig::default(),
//!     |_id, text| {
//!         text.split_whitespace()
//!             .map(|word| KeyValue::new(word, "1"))
//!             .collect()
//!     },
//!     |_key, values| values.len().to_string(),
//! )?;
//! let output = job.run(vec!["a b a".to_string()]).await?;
//! for line in output.lines() {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod job;
pub mod partition;
pub mod progress;
pub mod pure;
pub mod store;
pub mod types;
pub mod worker;

pub use coordinator::Coordinator;
pub use job::{JobOutput, MapReduceJob};
pub use partition::{ihash, partition_for};
pub use progress::{JobProgress, PhaseCounts};
pub use pure::scheduling::JobPhase;
pub use store::ReportOutcome;
pub use types::{KeyValue, MapFn, Partitions, ReduceFn, Task, TaskKind, TaskState, TaskStatus};
pub use worker::{Worker, WorkerSummary};

#[cfg(test)]
mod coordinator_test;
