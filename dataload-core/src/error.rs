//! Error Types
//!
//! Two layers of failure exist in a run:
//! - [`TaskError`]: a single file could not be read. Recorded on the task's
//!   record, never aborts the run.
//! - [`CoreError`]: the run as a whole cannot proceed (bad configuration,
//!   no input, pool construction failed) or a platform capability is missing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Run-level errors returned by strategies and the runner
#[derive(Debug, Error)]
pub enum CoreError {
    /// No tasks were given to the runner
    #[error("No input tasks to run")]
    EmptyInput,

    /// Requested configuration cannot be honoured on this host
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The host exposes no CPU affinity API
    #[error("CPU affinity is not supported on this platform: {0}")]
    UnsupportedPlatform(String),

    /// Affinity mask is empty or names a core that does not exist
    #[error("Invalid affinity mask: {0}")]
    InvalidMask(String),

    /// The OS rejected an affinity request
    #[error("Affinity call failed for thread {tid}: {source}")]
    Affinity {
        /// OS thread id the call targeted (0 = calling thread)
        tid: u64,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Worker pool could not be built
    #[error("Failed to build worker pool: {0}")]
    PoolBuild(String),

    /// A helper thread could not be spawned
    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The prefetch producer thread panicked
    #[error("Prefetch producer panicked: {0}")]
    PipelineProducerPanic(String),
}

/// Why a single task failed to load
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TaskError {
    /// Path does not exist
    #[error("file not found")]
    NotFound,

    /// Path exists but could not be opened
    #[error("permission denied")]
    PermissionDenied,

    /// File was read but contained no data
    #[error("file is empty")]
    Empty,

    /// Any other I/O failure
    #[error("I/O error: {0}")]
    Io(String),

    /// The loader panicked while reading
    #[error("loader panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Short machine-friendly name for reports
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::NotFound => "not_found",
            TaskError::PermissionDenied => "permission_denied",
            TaskError::Empty => "empty",
            TaskError::Io(_) => "io",
            TaskError::Panicked(_) => "panicked",
        }
    }
}

impl From<std::io::Error> for TaskError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => TaskError::NotFound,
            std::io::ErrorKind::PermissionDenied => TaskError::PermissionDenied,
            _ => TaskError::Io(e.to_string()),
        }
    }
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert_eq!(TaskError::from(missing), TaskError::NotFound);

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(TaskError::from(denied), TaskError::PermissionDenied);

        let other = std::io::Error::other("disk on fire");
        assert!(matches!(TaskError::from(other), TaskError::Io(msg) if msg.contains("disk on fire")));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(TaskError::Empty.kind(), "empty");
        assert_eq!(TaskError::Io("boom".to_string()).kind(), "io");
        assert_eq!(TaskError::Io("boom".to_string()).to_string(), "I/O error: boom");
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("bad read");
        assert_eq!(panic_message(payload.as_ref()), "bad read");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload.as_ref()), "Unknown panic");
    }
}
