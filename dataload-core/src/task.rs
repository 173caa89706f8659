//! Load Tasks
//!
//! A [`LoadTask`] names one file and its position in the submission order.
//! The actual read is delegated to a [`Loader`] so tests and alternative
//! backends can substitute their own I/O.

use crate::error::{TaskError, panic_message};
use crate::measure::{ExecutorId, Span, Timer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One unit of work: a file to load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTask {
    path: PathBuf,
    sequence_index: usize,
}

impl LoadTask {
    /// Create a task for `path` at position `sequence_index`
    pub fn new(sequence_index: usize, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sequence_index,
        }
    }

    /// Build tasks from paths, numbering them in iteration order
    pub fn from_paths<I, P>(paths: I) -> Vec<LoadTask>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        paths
            .into_iter()
            .enumerate()
            .map(|(i, p)| LoadTask::new(i, p))
            .collect()
    }

    /// File to load
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Position in the submission order
    pub fn sequence_index(&self) -> usize {
        self.sequence_index
    }

    /// Read the file through `loader`, timing the call on the current thread.
    ///
    /// A panicking loader unwinds through the caller.
    pub fn perform(&self, loader: &dyn Loader) -> LoadAttempt {
        self.timed(|| loader.load(&self.path))
    }

    /// Like [`perform`](Self::perform), but a loader panic becomes a failed
    /// attempt instead of unwinding into the worker.
    pub fn perform_guarded(&self, loader: &dyn Loader) -> LoadAttempt {
        self.timed(|| {
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| loader.load(&self.path))) {
                Ok(outcome) => outcome,
                Err(panic) => Err(TaskError::Panicked(panic_message(panic.as_ref()))),
            }
        })
    }

    fn timed(&self, read: impl FnOnce() -> Result<Vec<u8>, TaskError>) -> LoadAttempt {
        let executor = ExecutorId::current();
        let timer = Timer::start();
        let outcome = read();
        let span = timer.stop();
        LoadAttempt {
            executor,
            span,
            outcome,
        }
    }
}

/// Performs the actual read for a task
pub trait Loader: Send + Sync {
    /// Read the whole file, returning its bytes
    fn load(&self, path: &Path) -> Result<Vec<u8>, TaskError>;
}

/// Reads files from the local filesystem; empty files count as failures
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl Loader for FileLoader {
    fn load(&self, path: &Path) -> Result<Vec<u8>, TaskError> {
        let bytes = std::fs::read(path)?;
        if bytes.is_empty() {
            return Err(TaskError::Empty);
        }
        Ok(bytes)
    }
}

/// Raw result of performing a task, before memory sampling
#[derive(Debug)]
pub struct LoadAttempt {
    /// Thread that performed the read
    pub executor: ExecutorId,
    /// When the read ran
    pub span: Span,
    /// File contents or the failure
    pub outcome: Result<Vec<u8>, TaskError>,
}

impl LoadAttempt {
    /// Number of bytes read (0 on failure)
    pub fn bytes_read(&self) -> u64 {
        self.outcome.as_ref().map(|b| b.len() as u64).unwrap_or(0)
    }
}
