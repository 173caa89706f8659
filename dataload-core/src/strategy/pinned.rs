use super::pool::WorkerPool;
use super::{ExecutionStrategy, RunContext};
use crate::affinity::AffinityMask;
use crate::error::CoreError;
use crate::recorder::{Mode, RunMeta, RunSummary, RunWarning};
use crate::task::LoadTask;
use chrono::Utc;

/// Worker pool with every worker, and the calling thread, restricted to one
/// core.
///
/// The pool is sized to the host core count unless `workers` says otherwise,
/// so workers usually outnumber the single core they share. That
/// oversubscription is the point of the mode: it measures contention for one
/// core.
///
/// Hosts without an affinity API, or that refuse the pin, run the same pool
/// unpinned and mark the summary `degraded`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleCorePinned {
    /// Core every thread is pinned to
    pub core: usize,
    /// Pool size override
    pub workers: Option<usize>,
}

impl SingleCorePinned {
    /// Pin to `core` with one worker per host core
    pub fn new(core: usize) -> Self {
        Self {
            core,
            workers: None,
        }
    }

    /// Override the pool size (no upper bound)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
}

impl ExecutionStrategy for SingleCorePinned {
    fn mode(&self) -> Mode {
        Mode::SingleCorePinned
    }

    fn run(&self, tasks: Vec<LoadTask>, ctx: &RunContext) -> Result<RunSummary, CoreError> {
        let program_start = Utc::now();
        let total = tasks.len();
        let available = ctx.affinity.available_cores();

        let mask = AffinityMask::single(self.core);
        mask.validate(available)?;
        let size = match self.workers {
            Some(0) => {
                return Err(CoreError::InvalidConfiguration(
                    "worker count must be at least 1".to_string(),
                ));
            }
            Some(n) => n,
            None => available,
        };

        let recorder = ctx.recorder();
        let mut degraded = false;

        // Pin the caller first so the pool inherits the mask at spawn
        let pinned = match ctx.affinity.set_process_affinity(&mask) {
            Ok(()) => {
                tracing::info!(core = self.core, "calling thread pinned");
                true
            }
            Err(CoreError::UnsupportedPlatform(detail)) => {
                recorder.warn(RunWarning::AffinityUnsupported { detail });
                degraded = true;
                false
            }
            Err(e @ CoreError::InvalidMask(_)) => return Err(e),
            Err(e) => {
                // e.g. a cpuset that excludes the core
                recorder.warn(RunWarning::ProcessPinFailed {
                    detail: e.to_string(),
                });
                degraded = true;
                false
            }
        };

        let pool = WorkerPool::spawn(size, "pinned")?;
        if pinned {
            let confirmed = pool.pin_workers(ctx.affinity.as_ref(), &mask, &recorder);
            tracing::info!(
                workers = pool.size(),
                confirmed,
                core = self.core,
                "workers pinned"
            );
        } else {
            tracing::warn!(workers = pool.size(), "running unpinned");
        }

        pool.dispatch(tasks, ctx, &recorder);
        let worker_count = pool.size();
        drop(pool);

        let cancelled = ctx.cancel.is_cancelled() && recorder.len() < total;
        Ok(recorder.finalize(RunMeta {
            mode: Mode::SingleCorePinned,
            prefetch: false,
            worker_count,
            program_start,
            degraded,
            cancelled,
            affinity: ctx.affinity.process_affinity().ok(),
        }))
    }
}
