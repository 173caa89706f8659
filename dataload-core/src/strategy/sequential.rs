use super::{ExecutionStrategy, RunContext, execute_task};
use crate::error::CoreError;
use crate::pipeline::PrefetchPipeline;
use crate::recorder::{MetricsRecorder, Mode, RunMeta, RunSummary, RunWarning};
use crate::task::LoadTask;
use chrono::Utc;

/// One task at a time on the calling thread, no affinity change.
///
/// With `prefetch` the reads happen on a producer thread running up to
/// [`PREFETCH_DEPTH`](crate::PREFETCH_DEPTH) tasks ahead, and the calling
/// thread only records results.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential {
    /// Read through a [`PrefetchPipeline`]
    pub prefetch: bool,
}

impl Sequential {
    /// Plain sequential strategy
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequential strategy reading through the prefetch pipeline
    pub fn with_prefetch() -> Self {
        Self { prefetch: true }
    }

    fn run_direct(&self, tasks: &[LoadTask], ctx: &RunContext, recorder: &MetricsRecorder) {
        for task in tasks {
            if !execute_task(task, ctx, recorder) {
                tracing::debug!(remaining = tasks.len() - recorder.len(), "cancelled");
                break;
            }
        }
    }

    fn run_prefetched(
        &self,
        tasks: Vec<LoadTask>,
        ctx: &RunContext,
        recorder: &MetricsRecorder,
    ) -> Result<(), CoreError> {
        let mut pipeline = PrefetchPipeline::start(tasks, ctx.loader.clone(), ctx.cancel.clone())?;

        // The buffer in `slot` stays alive until after the memory sample
        while let Some(slot) = pipeline.next() {
            recorder.record(&slot.task, &slot.attempt);
        }

        match pipeline.finish() {
            Ok(()) => {}
            Err(CoreError::PipelineProducerPanic(detail)) => {
                recorder.warn(RunWarning::ProducerPanicked { detail });
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

impl ExecutionStrategy for Sequential {
    fn mode(&self) -> Mode {
        Mode::Sequential
    }

    fn run(&self, tasks: Vec<LoadTask>, ctx: &RunContext) -> Result<RunSummary, CoreError> {
        let program_start = Utc::now();
        let total = tasks.len();
        let recorder = ctx.recorder();

        tracing::info!(tasks = total, prefetch = self.prefetch, "sequential run");
        if self.prefetch {
            self.run_prefetched(tasks, ctx, &recorder)?;
        } else {
            self.run_direct(&tasks, ctx, &recorder);
        }

        let cancelled = ctx.cancel.is_cancelled() && recorder.len() < total;
        Ok(recorder.finalize(RunMeta {
            mode: Mode::Sequential,
            prefetch: self.prefetch,
            worker_count: if self.prefetch { 2 } else { 1 },
            program_start,
            degraded: false,
            cancelled,
            affinity: None,
        }))
    }
}
