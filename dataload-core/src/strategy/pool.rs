//! Worker Pool
//!
//! Fixed-size rayon pool owned by a single strategy run. Workers report their
//! OS identity right after spawn so they can be pinned individually before
//! any task is dispatched:
//!
//! ```text
//! spawn ─▶ broadcast(identify) ─▶ pin each ─▶ read back ─▶ dispatch
//! ```

use super::{RunContext, execute_task};
use crate::affinity::{AffinityController, AffinityMask, WorkerHandle};
use crate::error::CoreError;
use crate::measure::ExecutorId;
use crate::recorder::{MetricsRecorder, RunWarning};
use crate::task::LoadTask;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

pub(crate) struct WorkerPool {
    pool: ThreadPool,
    workers: Vec<WorkerHandle>,
}

impl WorkerPool {
    /// Spawn `size` workers and collect their identities
    pub(crate) fn spawn(size: usize, label: &'static str) -> Result<Self, CoreError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(size.max(1))
            .thread_name(move |i| format!("dataload-{}-{}", label, i))
            .build()
            .map_err(|e| CoreError::PoolBuild(e.to_string()))?;

        let mut workers = pool.broadcast(|ctx| WorkerHandle {
            index: ctx.index(),
            executor: ExecutorId::current(),
        });
        workers.sort_by_key(|w| w.index);

        tracing::debug!(workers = workers.len(), label, "worker pool spawned");
        Ok(Self { pool, workers })
    }

    pub(crate) fn size(&self) -> usize {
        self.workers.len()
    }

    /// Pin every worker to `mask` and confirm by reading the mask back.
    ///
    /// Failures are recorded as warnings; returns how many workers were
    /// confirmed.
    pub(crate) fn pin_workers(
        &self,
        controller: &dyn AffinityController,
        mask: &AffinityMask,
        recorder: &MetricsRecorder,
    ) -> usize {
        let mut confirmed = 0;
        for worker in &self.workers {
            if let Err(e) = controller.set_worker_affinity(worker, mask) {
                recorder.warn(RunWarning::WorkerPinFailed {
                    worker: worker.index,
                    detail: e.to_string(),
                });
                continue;
            }

            match controller.worker_affinity(worker) {
                Ok(actual) if &actual == mask => {
                    tracing::debug!(worker = worker.index, tid = worker.executor.tid, %mask, "worker pinned");
                    confirmed += 1;
                }
                Ok(actual) => recorder.warn(RunWarning::WorkerPinMismatch {
                    worker: worker.index,
                    expected: mask.clone(),
                    actual,
                }),
                Err(e) => recorder.warn(RunWarning::WorkerPinFailed {
                    worker: worker.index,
                    detail: e.to_string(),
                }),
            }
        }
        confirmed
    }

    /// Hand every task to the pool and block until all have run.
    ///
    /// Each task is its own job, so idle workers steal remaining tasks
    /// instead of waiting on a pre-split chunk.
    pub(crate) fn dispatch(
        &self,
        tasks: Vec<LoadTask>,
        ctx: &RunContext,
        recorder: &MetricsRecorder,
    ) {
        self.pool.install(|| {
            tasks.into_par_iter().with_max_len(1).for_each(|task| {
                execute_task(&task, ctx, recorder);
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affinity::UnsupportedAffinity;
    use crate::memory::NullMemoryProbe;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_spawn_reports_distinct_workers() {
        let pool = WorkerPool::spawn(3, "test").unwrap();
        assert_eq!(pool.size(), 3);

        let indices: Vec<_> = pool.workers.iter().map(|w| w.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        let names: HashSet<_> = pool
            .workers
            .iter()
            .filter_map(|w| w.executor.name.clone())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains("dataload-test-0"));
    }

    #[test]
    fn test_pin_failures_become_warnings() {
        let pool = WorkerPool::spawn(2, "test").unwrap();
        let recorder = MetricsRecorder::new(Arc::new(NullMemoryProbe));
        let controller = UnsupportedAffinity::with_cores(2);

        let confirmed = pool.pin_workers(&controller, &AffinityMask::single(0), &recorder);
        assert_eq!(confirmed, 0);

        let summary = recorder.finalize(crate::recorder::RunMeta {
            mode: crate::Mode::SingleCorePinned,
            prefetch: false,
            worker_count: 2,
            program_start: chrono::Utc::now(),
            degraded: true,
            cancelled: false,
            affinity: None,
        });
        assert_eq!(summary.warnings.len(), 2);
        assert!(matches!(
            summary.warnings[0],
            RunWarning::WorkerPinFailed { worker: 0, .. }
        ));
    }
}
