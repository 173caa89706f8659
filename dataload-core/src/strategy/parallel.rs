use super::pool::WorkerPool;
use super::{ExecutionStrategy, RunContext};
use crate::affinity::AffinityMask;
use crate::error::CoreError;
use crate::recorder::{Mode, RunMeta, RunSummary, RunWarning};
use crate::task::LoadTask;
use chrono::Utc;

/// Worker pool free to run on every core.
///
/// Completion order is unconstrained; records come back sorted by
/// submission index all the same.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiCoreParallel {
    /// Pool size override, at most the host core count
    pub workers: Option<usize>,
}

impl MultiCoreParallel {
    /// One worker per host core
    pub fn new() -> Self {
        Self::default()
    }

    /// Use exactly `workers` workers
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: Some(workers),
        }
    }
}

impl ExecutionStrategy for MultiCoreParallel {
    fn mode(&self) -> Mode {
        Mode::MultiCoreParallel
    }

    fn run(&self, tasks: Vec<LoadTask>, ctx: &RunContext) -> Result<RunSummary, CoreError> {
        let program_start = Utc::now();
        let total = tasks.len();
        let available = ctx.affinity.available_cores();

        let size = match self.workers {
            None => available,
            Some(n) if n == 0 || n > available => {
                return Err(CoreError::InvalidConfiguration(format!(
                    "worker count {} outside 1..={} available cores",
                    n, available
                )));
            }
            Some(n) => n,
        };

        let recorder = ctx.recorder();

        // Undo any earlier single-core pin on this thread before spawning
        let mask = AffinityMask::all(available);
        match ctx.affinity.set_process_affinity(&mask) {
            Ok(()) => tracing::info!(%mask, "calling thread spread over all cores"),
            Err(CoreError::UnsupportedPlatform(detail)) => {
                tracing::debug!(%detail, "affinity unsupported, leaving mask unchanged");
            }
            Err(e) => recorder.warn(RunWarning::ProcessPinFailed {
                detail: e.to_string(),
            }),
        }

        let pool = WorkerPool::spawn(size, "parallel")?;
        tracing::info!(workers = pool.size(), tasks = total, "parallel run");
        pool.dispatch(tasks, ctx, &recorder);
        let worker_count = pool.size();
        drop(pool);

        let cancelled = ctx.cancel.is_cancelled() && recorder.len() < total;
        Ok(recorder.finalize(RunMeta {
            mode: Mode::MultiCoreParallel,
            prefetch: false,
            worker_count,
            program_start,
            degraded: false,
            cancelled,
            affinity: ctx.affinity.process_affinity().ok(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affinity::{AffinityController, SystemAffinity, UnsupportedAffinity};
    use crate::strategy::testing::{FakeLoader, context, tasks};
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_worker_count_guard_touches_nothing() {
        let loader = Arc::new(FakeLoader::default());
        let ctx = context(loader.clone()).with_affinity(Arc::new(UnsupportedAffinity::with_cores(2)));

        for workers in [0, 3] {
            let err = MultiCoreParallel::with_workers(workers)
                .run(tasks(&["a", "b"]), &ctx)
                .unwrap_err();
            assert!(matches!(err, CoreError::InvalidConfiguration(_)));
        }
        assert!(loader.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_records_sorted_despite_completion_order() {
        let loader = Arc::new(FakeLoader::default());
        let ctx = context(loader.clone()).with_affinity(Arc::new(UnsupportedAffinity::with_cores(4)));

        // First task finishes last
        let names = ["slow-120-a", "slow-60-b", "slow-20-c", "d"];
        let summary = MultiCoreParallel::with_workers(4)
            .run(tasks(&names), &ctx)
            .unwrap();

        let indices: Vec<_> = summary.records.iter().map(|r| r.sequence_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert!(summary.records[3].end_time <= summary.records[0].end_time);
        assert!(!summary.degraded);
        assert_eq!(summary.worker_count, 4);
    }

    #[test]
    fn test_work_spreads_over_workers() {
        let loader = Arc::new(FakeLoader::default());
        let ctx = context(loader.clone()).with_affinity(Arc::new(UnsupportedAffinity::with_cores(4)));

        let names: Vec<String> = (0..8).map(|i| format!("slow-30-{}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let summary = MultiCoreParallel::with_workers(4)
            .run(tasks(&names), &ctx)
            .unwrap();

        let workers: HashSet<_> = summary
            .records
            .iter()
            .map(|r| r.executor.name.clone())
            .collect();
        assert!(workers.len() > 1);
        assert_eq!(summary.records.len(), 8);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_widens_a_previously_pinned_caller() {
        // Scratch thread so the pin does not outlive the test
        std::thread::spawn(|| {
            let allowed = SystemAffinity.process_affinity().unwrap();
            SystemAffinity
                .set_process_affinity(&AffinityMask::single(allowed.first()))
                .unwrap();

            let loader = Arc::new(FakeLoader::default());
            let ctx = context(loader.clone());
            let summary = MultiCoreParallel::new()
                .run(tasks(&["a", "b", "c", "d"]), &ctx)
                .unwrap();

            assert!(summary.warnings.is_empty(), "{:?}", summary.warnings);
            assert!(!summary.degraded);
            assert_eq!(summary.records.len(), 4);
            assert_eq!(summary.worker_count, SystemAffinity.available_cores());
            assert_eq!(summary.affinity, Some(allowed.clone()));
            assert_eq!(SystemAffinity.process_affinity().unwrap(), allowed);
        })
        .join()
        .unwrap();
    }
}
