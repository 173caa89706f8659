//! Timing and Executor Identity
//!
//! Wall-clock timestamps come from `chrono` for reporting, durations from the
//! monotonic clock. The end timestamp of a [`Span`] is derived from the start
//! plus the monotonic elapsed time, so `start <= end` holds even if the wall
//! clock steps backwards mid-read.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ─── Span ────────────────────────────────────────────────────────────────────

/// Start/end/duration triple for one measured operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Wall-clock time the operation started
    pub start: DateTime<Utc>,
    /// Wall-clock time the operation finished
    pub end: DateTime<Utc>,
    /// Monotonic elapsed time
    pub duration: Duration,
}

// ─── Timer ───────────────────────────────────────────────────────────────────

/// Timer pairing a wall-clock start with a monotonic start
pub struct Timer {
    wall: DateTime<Utc>,
    start: std::time::Instant,
}

impl Timer {
    /// Start a new timer
    #[inline]
    pub fn start() -> Self {
        Self {
            wall: Utc::now(),
            start: std::time::Instant::now(),
        }
    }

    /// Wall-clock time the timer started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.wall
    }

    /// Stop the timer and return the measured span
    #[inline]
    pub fn stop(&self) -> Span {
        let duration = self.start.elapsed();
        let delta = TimeDelta::from_std(duration).unwrap_or(TimeDelta::zero());
        let end = self.wall.checked_add_signed(delta).unwrap_or(self.wall);
        Span {
            start: self.wall,
            end,
            duration,
        }
    }
}

// ─── Executor identity ───────────────────────────────────────────────────────

/// Process/thread identity of whoever executed a task
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutorId {
    /// OS process id
    pub pid: u32,
    /// OS thread id (Linux tid; 0 where unavailable)
    pub tid: u64,
    /// Thread name, if the thread has one
    pub name: Option<String>,
}

impl ExecutorId {
    /// Identity of the calling thread
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            tid: current_tid(),
            name: std::thread::current().name().map(str::to_string),
        }
    }
}

impl fmt::Display for ExecutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}/{} ({})", self.pid, self.tid, name),
            None => write!(f, "{}/{}", self.pid, self.tid),
        }
    }
}

/// OS thread id of the calling thread
#[cfg(target_os = "linux")]
pub fn current_tid() -> u64 {
    // SAFETY: gettid takes no arguments and cannot fail.
    unsafe { libc::syscall(libc::SYS_gettid) as u64 }
}

/// OS thread id of the calling thread
#[cfg(not(target_os = "linux"))]
pub fn current_tid() -> u64 {
    0
}
