//! Execution Strategies
//!
//! One trait, three ways to run the same list of load tasks:
//!
//! - [`Sequential`] - calling thread, one task at a time (optionally behind a
//!   [`PrefetchPipeline`](crate::PrefetchPipeline))
//! - [`SingleCorePinned`] - worker pool, every worker pinned to one core
//! - [`MultiCoreParallel`] - worker pool spread across all cores
//!
//! Every strategy returns its records sorted by `sequence_index`, regardless
//! of the order in which tasks completed.

mod parallel;
mod pinned;
mod pool;
mod sequential;

pub use parallel::MultiCoreParallel;
pub use pinned::SingleCorePinned;
pub use sequential::Sequential;

use crate::affinity::{AffinityController, SystemAffinity};
use crate::cancel::CancellationToken;
use crate::error::CoreError;
use crate::memory::{MemoryProbe, default_memory_probe};
use crate::recorder::{MetricsRecorder, Mode, RecordObserver, RunSummary};
use crate::task::{FileLoader, LoadTask, Loader};
use std::sync::Arc;

/// Collaborators a strategy runs with
#[derive(Clone)]
pub struct RunContext {
    /// Performs the reads
    pub loader: Arc<dyn Loader>,
    /// Applies and inspects CPU pinning
    pub affinity: Arc<dyn AffinityController>,
    /// Samples process memory after each read
    pub memory: Arc<dyn MemoryProbe>,
    /// Checked between tasks
    pub cancel: CancellationToken,
    /// Notified for each completed task
    pub observer: Option<Arc<dyn RecordObserver>>,
}

impl RunContext {
    /// Filesystem loader, OS affinity, best available memory probe
    pub fn system() -> Self {
        Self {
            loader: Arc::new(FileLoader),
            affinity: Arc::new(SystemAffinity),
            memory: default_memory_probe(),
            cancel: CancellationToken::new(),
            observer: None,
        }
    }

    /// Replace the loader
    pub fn with_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loader = loader;
        self
    }

    /// Replace the affinity controller
    pub fn with_affinity(mut self, affinity: Arc<dyn AffinityController>) -> Self {
        self.affinity = affinity;
        self
    }

    /// Replace the memory probe
    pub fn with_memory(mut self, memory: Arc<dyn MemoryProbe>) -> Self {
        self.memory = memory;
        self
    }

    /// Use an externally owned cancellation token
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Attach a record observer
    pub fn with_observer(mut self, observer: Arc<dyn RecordObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub(crate) fn recorder(&self) -> MetricsRecorder {
        MetricsRecorder::new(self.memory.clone()).with_observer(self.observer.clone())
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::system()
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

/// Dispatches load tasks under one concurrency/affinity policy
pub trait ExecutionStrategy: Send + Sync {
    /// Mode this strategy implements
    fn mode(&self) -> Mode;

    /// Run every task and return the records in submission order
    fn run(&self, tasks: Vec<LoadTask>, ctx: &RunContext) -> Result<RunSummary, CoreError>;
}

/// Run one task on the current thread and record it; skipped once cancelled
pub(crate) fn execute_task(task: &LoadTask, ctx: &RunContext, recorder: &MetricsRecorder) -> bool {
    if ctx.cancel.is_cancelled() {
        return false;
    }
    let attempt = task.perform_guarded(ctx.loader.as_ref());
    recorder.record(task, &attempt);
    true
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for strategy tests

    use crate::error::TaskError;
    use crate::measure::ExecutorId;
    use crate::memory::NullMemoryProbe;
    use crate::task::{LoadTask, Loader};
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory loader: `missing*` paths fail, `slow-<ms>*` paths sleep first
    #[derive(Default)]
    pub struct FakeLoader {
        pub seen: Mutex<Vec<(String, ExecutorId)>>,
        pub files: HashMap<String, usize>,
    }

    impl Loader for FakeLoader {
        fn load(&self, path: &Path) -> Result<Vec<u8>, TaskError> {
            let name = path.to_string_lossy().into_owned();
            self.seen
                .lock()
                .unwrap()
                .push((name.clone(), ExecutorId::current()));

            if let Some(ms) = name
                .strip_prefix("slow-")
                .and_then(|rest| rest.split('-').next())
                .and_then(|ms| ms.parse::<u64>().ok())
            {
                std::thread::sleep(Duration::from_millis(ms));
            }
            if name.starts_with("missing") {
                return Err(TaskError::NotFound);
            }
            let len = self.files.get(&name).copied().unwrap_or(16);
            Ok(vec![b'x'; len])
        }
    }

    pub fn tasks(names: &[&str]) -> Vec<LoadTask> {
        LoadTask::from_paths(names.iter().map(|n| n.to_string()))
    }

    pub fn context(loader: Arc<FakeLoader>) -> super::RunContext {
        super::RunContext::system()
            .with_loader(loader)
            .with_memory(Arc::new(NullMemoryProbe))
    }
}
