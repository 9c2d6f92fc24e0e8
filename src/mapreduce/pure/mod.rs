//! Pure functional utilities for MapReduce execution
//!
//! Scheduling decisions and reduce output assembly live here as plain
//! functions over plain data, so they can be tested without a runtime.

pub mod aggregation;
pub mod scheduling;
