#![warn(missing_docs)]
//! # Dataload
//!
//! Measures how fast a batch of files loads under different CPU scheduling
//! strategies, recording per-file timing, executor identity and memory.
//!
//! - **Sequential**: one file at a time on the calling thread
//! - **Prefetch**: sequential consumption behind a bounded read-ahead pipeline
//! - **Single core**: a worker pool with every worker pinned to one core
//! - **Multi core**: a worker pool spread across all cores
//!
//! Every run returns a [`RunSummary`] whose records are ordered by submission
//! index, whatever order the files finished in.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dataload::prelude::*;
//!
//! let tasks = LoadTask::from_paths(["data/a.csv", "data/b.csv"]);
//! let runner = BenchmarkRunner::new(RunnerConfig::new(Mode::MultiCoreParallel));
//! let summary = runner.run(tasks)?;
//!
//! let stats = RunStatistics::from_summary(&summary);
//! println!("{}", format_human_output(&summary, &stats, None));
//! # Ok::<(), dataload::CoreError>(())
//! ```
//!
//! ## Custom collaborators
//!
//! The loader, affinity controller and memory probe are traits. Swap them
//! through [`RunContext`] to test strategies without touching the OS:
//!
//! ```no_run
//! use dataload::prelude::*;
//! use std::sync::Arc;
//!
//! let context = RunContext::system().with_affinity(Arc::new(UnsupportedAffinity::new()));
//! let runner = BenchmarkRunner::with_context(RunnerConfig::new(Mode::SingleCorePinned), context);
//! ```

// Re-export core types
pub use dataload_core::{
    AffinityController, AffinityMask, BenchmarkRunner, CancellationToken, CoreError,
    ExecutionStrategy, ExecutorId, FileLoader, LoadAttempt, LoadTask, Loader, MemoryProbe,
    MemorySample, MetricsRecorder, Mode, MultiCoreParallel, NullMemoryProbe, PREFETCH_DEPTH,
    PipelineHandle, PipelineSlot, PrefetchPipeline, ProcfsMemoryProbe, RecordObserver, RunContext,
    RunMeta, RunSummary, RunWarning, RunnerConfig, Sequential, SingleCorePinned, Span,
    SystemAffinity, TaskError, TaskRecord, Timer, UnsupportedAffinity, WorkerHandle,
    default_memory_probe, host_core_count,
};

// Re-export reporting
pub use dataload_report::{
    DurationSummary, OutputFormat, RunReport, RunStatistics, SystemInfo, compute_percentile,
    default_report_name, format_human_output, generate_csv_report, generate_json_report,
};

// Re-export CLI entry points
pub use dataload_cli::{Cli, DataloadConfig, collect_inputs, collect_system_info, run, run_with_cli};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BenchmarkRunner, CoreError, LoadTask, Mode, RunContext, RunStatistics, RunSummary,
        RunnerConfig, UnsupportedAffinity, format_human_output,
    };
}
