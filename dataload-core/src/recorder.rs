//! Metrics Recorder
//!
//! Collects one [`TaskRecord`] per executed task from any number of workers.
//! Appends go through a single mutex; [`MetricsRecorder::finalize`] consumes
//! the recorder after every worker has joined and produces the immutable
//! [`RunSummary`], sorted by submission order.

use crate::affinity::AffinityMask;
use crate::error::TaskError;
use crate::measure::{ExecutorId, Span};
use crate::memory::{MemoryProbe, MemorySample};
use crate::task::{LoadAttempt, LoadTask};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Execution strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// One task at a time on the calling thread
    #[default]
    Sequential,
    /// Worker pool with every worker pinned to one core
    #[serde(rename = "single_core")]
    SingleCorePinned,
    /// Worker pool spread across all cores
    #[serde(rename = "multi_core")]
    MultiCoreParallel,
}

impl Mode {
    /// Name used on the command line, in config files and report names
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Sequential => "sequential",
            Mode::SingleCorePinned => "single_core",
            Mode::MultiCoreParallel => "multi_core",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "sequential" | "seq" => Ok(Mode::Sequential),
            "single_core" | "same_core" => Ok(Mode::SingleCorePinned),
            "multi_core" | "parallel" => Ok(Mode::MultiCoreParallel),
            other => Err(format!("Unknown mode: {}", other)),
        }
    }
}

/// Instrumentation for one completed task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Position in the submission order
    pub sequence_index: usize,
    /// File that was loaded
    pub path: PathBuf,
    /// Thread that performed the read
    pub executor: ExecutorId,
    /// Read start (wall clock)
    pub start_time: DateTime<Utc>,
    /// Read end (wall clock), never before `start_time`
    pub end_time: DateTime<Utc>,
    /// Monotonic read duration
    pub duration: Duration,
    /// Bytes read (0 on failure)
    pub bytes_read: u64,
    /// Process virtual size right after the read
    pub virtual_memory_bytes: u64,
    /// Process resident size right after the read
    pub resident_memory_bytes: u64,
    /// Whether the read succeeded
    pub success: bool,
    /// Failure reason when `success` is false
    pub error: Option<TaskError>,
}

impl TaskRecord {
    /// Build a record from an attempt and a memory sample
    pub fn from_attempt(task: &LoadTask, attempt: &LoadAttempt, memory: MemorySample) -> Self {
        let Span {
            start,
            end,
            duration,
        } = attempt.span;
        Self {
            sequence_index: task.sequence_index(),
            path: task.path().to_path_buf(),
            executor: attempt.executor.clone(),
            start_time: start,
            end_time: end,
            duration,
            bytes_read: attempt.bytes_read(),
            virtual_memory_bytes: memory.virtual_bytes,
            resident_memory_bytes: memory.resident_bytes,
            success: attempt.outcome.is_ok(),
            error: attempt.outcome.as_ref().err().cloned(),
        }
    }

    /// File name without its directory
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Non-fatal condition noticed during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// Host has no affinity API; pinning was skipped
    AffinityUnsupported {
        /// Reason reported by the controller
        detail: String,
    },
    /// Caller thread could not be pinned
    ProcessPinFailed {
        /// OS error text
        detail: String,
    },
    /// A worker could not be pinned
    WorkerPinFailed {
        /// Worker index in the pool
        worker: usize,
        /// OS error text
        detail: String,
    },
    /// A worker's mask read back different from the requested one
    WorkerPinMismatch {
        /// Worker index in the pool
        worker: usize,
        /// Requested mask
        expected: AffinityMask,
        /// Observed mask
        actual: AffinityMask,
    },
    /// The prefetch producer died; results are partial
    ProducerPanicked {
        /// Panic message
        detail: String,
    },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::AffinityUnsupported { detail } => {
                write!(f, "affinity unsupported, running unpinned: {}", detail)
            }
            RunWarning::ProcessPinFailed { detail } => {
                write!(f, "failed to pin calling thread: {}", detail)
            }
            RunWarning::WorkerPinFailed { worker, detail } => {
                write!(f, "failed to pin worker {}: {}", worker, detail)
            }
            RunWarning::WorkerPinMismatch {
                worker,
                expected,
                actual,
            } => write!(
                f,
                "worker {} pinned to {} instead of {}",
                worker, actual, expected
            ),
            RunWarning::ProducerPanicked { detail } => {
                write!(f, "prefetch producer panicked: {}", detail)
            }
        }
    }
}

/// Everything about a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Strategy that produced the records
    pub mode: Mode,
    /// Whether reads went through the prefetch pipeline
    pub prefetch: bool,
    /// Threads that executed tasks (1 for sequential, 2 with prefetch)
    pub worker_count: usize,
    /// When the run started
    pub program_start: DateTime<Utc>,
    /// When the run finished
    pub program_end: DateTime<Utc>,
    /// One record per executed task, ordered by `sequence_index`
    pub records: Vec<TaskRecord>,
    /// Non-fatal problems seen during the run
    pub warnings: Vec<RunWarning>,
    /// Pinning was requested but not applied
    pub degraded: bool,
    /// Cancellation was requested before every task ran
    pub cancelled: bool,
    /// Calling thread's mask observed after the run, if the host can tell
    pub affinity: Option<AffinityMask>,
}

impl RunSummary {
    /// Records whose read succeeded
    pub fn succeeded(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.iter().filter(|r| r.success)
    }

    /// Records whose read failed
    pub fn failed(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.iter().filter(|r| !r.success)
    }

    /// Number of failed records
    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    /// Time between program start and end
    pub fn wall_time(&self) -> Duration {
        (self.program_end - self.program_start)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Run-level facts supplied by the strategy at finalize time
#[derive(Debug, Clone)]
pub struct RunMeta {
    /// Strategy that ran
    pub mode: Mode,
    /// Whether prefetch was used
    pub prefetch: bool,
    /// Executing thread count
    pub worker_count: usize,
    /// When the strategy started
    pub program_start: DateTime<Utc>,
    /// Pinning was requested but not applied
    pub degraded: bool,
    /// Cancellation was observed
    pub cancelled: bool,
    /// Observed mask of the calling thread
    pub affinity: Option<AffinityMask>,
}

/// Notified after each record is appended
pub trait RecordObserver: Send + Sync {
    /// Called from the worker that produced `record`
    fn on_record(&self, record: &TaskRecord);
}

/// Thread-safe, append-only record collector
pub struct MetricsRecorder {
    records: Mutex<Vec<TaskRecord>>,
    warnings: Mutex<Vec<RunWarning>>,
    memory: Arc<dyn MemoryProbe>,
    observer: Option<Arc<dyn RecordObserver>>,
}

impl MetricsRecorder {
    /// Recorder sampling memory through `memory`
    pub fn new(memory: Arc<dyn MemoryProbe>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            warnings: Mutex::new(Vec::new()),
            memory,
            observer: None,
        }
    }

    /// Attach an observer notified after each append
    pub fn with_observer(mut self, observer: Option<Arc<dyn RecordObserver>>) -> Self {
        self.observer = observer;
        self
    }

    /// Sample memory and append a record for `attempt`.
    ///
    /// Call while the attempt's buffer is still alive so the resident size
    /// includes the loaded file.
    pub fn record(&self, task: &LoadTask, attempt: &LoadAttempt) {
        let memory = self.memory.sample();
        self.push(TaskRecord::from_attempt(task, attempt, memory));
    }

    /// Append a prebuilt record
    pub fn push(&self, record: TaskRecord) {
        if let Some(observer) = &self.observer {
            observer.on_record(&record);
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Remember a non-fatal problem
    pub fn warn(&self, warning: RunWarning) {
        tracing::warn!(%warning, "run warning");
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(warning);
    }

    /// Records appended so far
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seal the recorder into a summary ordered by submission index
    pub fn finalize(self, meta: RunMeta) -> RunSummary {
        let mut records = self
            .records
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        records.sort_by_key(|r| r.sequence_index);
        let warnings = self
            .warnings
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        RunSummary {
            mode: meta.mode,
            prefetch: meta.prefetch,
            worker_count: meta.worker_count,
            program_start: meta.program_start,
            program_end: Utc::now().max(meta.program_start),
            records,
            warnings,
            degraded: meta.degraded,
            cancelled: meta.cancelled,
            affinity: meta.affinity,
        }
    }
}
