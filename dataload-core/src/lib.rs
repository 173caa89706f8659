#![warn(missing_docs)]
//! Dataload Core - Execution Engine
//!
//! Loads a list of files under one of three execution strategies and records
//! per-file timing, executor identity and memory:
//! - `Sequential` on the calling thread, optionally behind a bounded
//!   prefetch pipeline
//! - `SingleCorePinned` with every worker restricted to one core
//! - `MultiCoreParallel` with a worker pool spread across all cores
//!
//! OS access (CPU affinity, memory statistics) goes through the
//! [`AffinityController`] and [`MemoryProbe`] traits, so strategies run
//! unchanged on hosts lacking either API.

mod affinity;
mod cancel;
mod error;
mod measure;
mod memory;
mod pipeline;
mod recorder;
mod runner;
mod strategy;
mod task;

pub use affinity::{
    AffinityController, AffinityMask, SystemAffinity, UnsupportedAffinity, WorkerHandle,
    host_core_count,
};
pub use cancel::CancellationToken;
pub use error::{CoreError, TaskError};
pub use measure::{ExecutorId, Span, Timer};
pub use memory::{
    MemoryProbe, MemorySample, NullMemoryProbe, ProcfsMemoryProbe, default_memory_probe,
};
pub use pipeline::{PREFETCH_DEPTH, PipelineHandle, PipelineSlot, PrefetchPipeline};
pub use recorder::{
    MetricsRecorder, Mode, RecordObserver, RunMeta, RunSummary, RunWarning, TaskRecord,
};
pub use runner::{BenchmarkRunner, RunnerConfig};
pub use strategy::{ExecutionStrategy, MultiCoreParallel, RunContext, Sequential, SingleCorePinned};
pub use task::{FileLoader, LoadAttempt, LoadTask, Loader};
