//! Job runner: one coordinator, a fixed pool of workers, joined to the end

use super::coordinator::Coordinator;
use super::progress::JobProgress;
use super::types::{KeyValue, MapFn, ReduceFn};
use super::worker::{Worker, WorkerSummary};
use crate::config::MapReduceConfig;
use crate::error::{MapReduceError, MapReduceResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Everything a finished job produced
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub job_id: Uuid,
    /// Output blob per reduce partition, in partition order
    pub outputs: Vec<String>,
    pub progress: JobProgress,
    pub workers: Vec<WorkerSummary>,
    pub duration: Duration,
}

impl JobOutput {
    /// Non-empty output lines across all partitions
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.outputs
            .iter()
            .flat_map(|blob| blob.lines())
            .filter(|line| !line.trim().is_empty())
    }
}

/// A configured MapReduce computation that can be run over inputs
#[derive(Clone)]
pub struct MapReduceJob {
    config: MapReduceConfig,
    map_fn: MapFn,
    reduce_fn: ReduceFn,
}

impl MapReduceJob {
    pub fn new(
        config: MapReduceConfig,
        map_fn: MapFn,
        reduce_fn: ReduceFn,
    ) -> MapReduceResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            map_fn,
            reduce_fn,
        })
    }

    /// Build a job from plain closures
    pub fn from_fns<M, R>(
        config: MapReduceConfig,
        map_fn: M,
        reduce_fn: R,
    ) -> MapReduceResult<Self>
    where
        M: Fn(&str, &str) -> Vec<KeyValue> + Send + Sync + 'static,
        R: Fn(&str, &[String]) -> String + Send + Sync + 'static,
    {
        Self::new(config, Arc::new(map_fn), Arc::new(reduce_fn))
    }

    /// Run the job over `inputs` and wait for every worker to exit
    pub async fn run(&self, inputs: Vec<String>) -> MapReduceResult<JobOutput> {
        let coordinator = Arc::new(Coordinator::with_config(
            inputs,
            self.config.num_reduce,
            self.config.scheduler.clone(),
        )?);
        self.run_with(coordinator).await
    }

    /// Run the worker pool against an existing coordinator
    pub async fn run_with(&self, coordinator: Arc<Coordinator>) -> MapReduceResult<JobOutput> {
        let job_id = Uuid::new_v4();
        let started = tokio::time::Instant::now();
        info!(
            "Starting job {} with {} workers over {} inputs",
            job_id,
            self.config.num_workers,
            coordinator.num_map()
        );

        let handles: Vec<_> = (0..self.config.num_workers)
            .map(|worker_id| {
                let worker = Worker::new(
                    worker_id,
                    Arc::clone(&coordinator),
                    Arc::clone(&self.map_fn),
                    Arc::clone(&self.reduce_fn),
                );
                let span = info_span!("worker", job = %job_id, id = worker_id);
                tokio::spawn(worker.run().instrument(span))
            })
            .collect();

        let mut summaries = Vec::with_capacity(handles.len());
        let mut first_error = None;
        for (worker_id, handle) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(source) => Err(MapReduceError::WorkerPanicked { worker_id, source }),
            };
            match result {
                Ok(summary) => summaries.push(summary),
                Err(err) => {
                    error!("Worker {} failed: {}", worker_id, err);
                    first_error.get_or_insert(err);
                }
            }
        }

        let progress = coordinator.progress().await;
        if !coordinator.is_complete().await {
            error!(
                "Job {} stopped at {:.1}% complete: {}",
                job_id,
                progress.percent_complete(),
                progress
            );
            return Err(first_error.unwrap_or(MapReduceError::JobIncomplete {
                pending_map: progress.map.pending(),
                pending_reduce: progress.reduce.pending(),
            }));
        }
        if first_error.is_some() {
            warn!(
                "Job {} completed despite {} failed workers",
                job_id,
                self.config.num_workers - summaries.len()
            );
        }

        let duration = started.elapsed();
        info!("Job {} finished in {:?}: {}", job_id, duration, progress);
        Ok(JobOutput {
            job_id,
            outputs: coordinator.outputs().await,
            progress,
            workers: summaries,
            duration,
        })
    }
}

impl std::fmt::Debug for MapReduceJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapReduceJob")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
