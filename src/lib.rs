//! # mapreduce-engine
//!
//! An in-process MapReduce engine: a coordinator that schedules map and
//! reduce tasks, and a pool of async workers that execute them.
//!
//! ## Usage
//!
//! ```bash
//! mapreduce-engine run --input anime.json [--reduce 4] [--workers 4] [--config mapreduce.yaml]
//! ```
//!
//! ## Modules
//!
//! - `mapreduce` - Coordinator, workers, partitioning and the job runner
//! - `config` - Worker, partition and scheduler settings
//! - `error` - Structured error types
//! - `catalog` - The anime genre statistics job
//! - `cli` - Command-line parsing and routing
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod mapreduce;
