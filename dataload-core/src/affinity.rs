//! CPU Affinity
//!
//! All scheduling-hint changes go through an [`AffinityController`] so
//! strategies never touch the OS directly, and hosts without an affinity API
//! can plug in [`UnsupportedAffinity`] without changing strategy code.
//!
//! "Process" affinity here means the calling thread: Linux applies
//! `sched_setaffinity(0, ..)` to the caller only, and every thread it spawns
//! afterwards inherits the mask. Workers that already exist are pinned
//! individually through their [`WorkerHandle`].

use crate::error::CoreError;
use crate::measure::ExecutorId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Non-empty set of core indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityMask {
    cores: BTreeSet<usize>,
}

impl AffinityMask {
    /// Build a mask from core indices; fails if no core is given
    pub fn new(cores: impl IntoIterator<Item = usize>) -> Result<Self, CoreError> {
        let cores: BTreeSet<usize> = cores.into_iter().collect();
        if cores.is_empty() {
            return Err(CoreError::InvalidMask("mask is empty".to_string()));
        }
        Ok(Self { cores })
    }

    /// Mask with exactly one core
    pub fn single(core: usize) -> Self {
        Self {
            cores: BTreeSet::from([core]),
        }
    }

    /// Mask covering cores `0..count` (at least core 0)
    pub fn all(count: usize) -> Self {
        Self {
            cores: (0..count.max(1)).collect(),
        }
    }

    /// Check every core exists on a host with `available` cores
    pub fn validate(&self, available: usize) -> Result<(), CoreError> {
        match self.cores.iter().find(|&&c| c >= available) {
            Some(core) => Err(CoreError::InvalidMask(format!(
                "core {} does not exist (host has {} cores)",
                core, available
            ))),
            None => Ok(()),
        }
    }

    /// Core indices in ascending order
    pub fn cores(&self) -> impl Iterator<Item = usize> + '_ {
        self.cores.iter().copied()
    }

    /// Lowest core in the mask
    pub fn first(&self) -> usize {
        self.cores.first().copied().unwrap_or(0)
    }

    /// Whether `core` is in the mask
    pub fn contains(&self, core: usize) -> bool {
        self.cores.contains(&core)
    }

    /// Number of cores in the mask
    pub fn len(&self) -> usize {
        self.cores.len()
    }

    /// Always false; masks are non-empty by construction
    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }
}

impl fmt::Display for AffinityMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cores: Vec<String> = self.cores.iter().map(|c| c.to_string()).collect();
        write!(f, "[{}]", cores.join(", "))
    }
}

/// A spawned pool worker, identified by its OS thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerHandle {
    /// Index inside the pool
    pub index: usize,
    /// Identity reported by the worker itself
    pub executor: ExecutorId,
}

/// Query/set which cores the caller or a worker may run on
pub trait AffinityController: Send + Sync {
    /// Logical core count of the host, independent of the current mask
    fn available_cores(&self) -> usize;

    /// Restrict the calling thread (and threads it spawns later) to `mask`
    fn set_process_affinity(&self, mask: &AffinityMask) -> Result<(), CoreError>;

    /// Current mask of the calling thread
    fn process_affinity(&self) -> Result<AffinityMask, CoreError>;

    /// Restrict an existing worker to `mask`; call before it receives work
    fn set_worker_affinity(&self, worker: &WorkerHandle, mask: &AffinityMask)
    -> Result<(), CoreError>;

    /// Current mask of a worker
    fn worker_affinity(&self, worker: &WorkerHandle) -> Result<AffinityMask, CoreError>;
}

/// Host logical core count (online processors)
pub fn host_core_count() -> usize {
    #[cfg(target_os = "linux")]
    {
        // SAFETY: sysconf has no preconditions.
        let online = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
        if online > 0 {
            return online as usize;
        }
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

// ─── OS-backed controller ────────────────────────────────────────────────────

/// Controller backed by `sched_setaffinity`/`sched_getaffinity`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAffinity;

#[cfg(target_os = "linux")]
mod sys {
    use crate::affinity::AffinityMask;
    use crate::error::CoreError;

    fn set_size() -> usize {
        libc::CPU_SETSIZE as usize
    }

    pub(super) fn set(tid: u64, mask: &AffinityMask) -> Result<(), CoreError> {
        if let Some(core) = mask.cores().find(|&c| c >= set_size()) {
            return Err(CoreError::InvalidMask(format!(
                "core {} exceeds CPU_SETSIZE",
                core
            )));
        }

        // SAFETY: cpu_set_t is plain data; zeroed is a valid empty set and the
        // CPU_* helpers only index within CPU_SETSIZE, checked above.
        let result = unsafe {
            let mut set: libc::cpu_set_t = std::mem::zeroed();
            libc::CPU_ZERO(&mut set);
            for core in mask.cores() {
                libc::CPU_SET(core, &mut set);
            }
            libc::sched_setaffinity(
                tid as libc::pid_t,
                std::mem::size_of::<libc::cpu_set_t>(),
                &set,
            )
        };

        if result == 0 {
            Ok(())
        } else {
            Err(CoreError::Affinity {
                tid,
                source: std::io::Error::last_os_error(),
            })
        }
    }

    pub(super) fn get(tid: u64) -> Result<AffinityMask, CoreError> {
        // SAFETY: see `set`; the kernel fills at most size_of::<cpu_set_t>() bytes.
        let (result, cores) = unsafe {
            let mut set: libc::cpu_set_t = std::mem::zeroed();
            let result = libc::sched_getaffinity(
                tid as libc::pid_t,
                std::mem::size_of::<libc::cpu_set_t>(),
                &mut set,
            );
            let cores: Vec<usize> = (0..set_size())
                .filter(|&c| libc::CPU_ISSET(c, &set))
                .collect();
            (result, cores)
        };

        if result != 0 {
            return Err(CoreError::Affinity {
                tid,
                source: std::io::Error::last_os_error(),
            });
        }
        AffinityMask::new(cores)
    }
}

#[cfg(target_os = "linux")]
impl AffinityController for SystemAffinity {
    fn available_cores(&self) -> usize {
        host_core_count()
    }

    fn set_process_affinity(&self, mask: &AffinityMask) -> Result<(), CoreError> {
        mask.validate(self.available_cores())?;
        sys::set(0, mask)
    }

    fn process_affinity(&self) -> Result<AffinityMask, CoreError> {
        sys::get(0)
    }

    fn set_worker_affinity(
        &self,
        worker: &WorkerHandle,
        mask: &AffinityMask,
    ) -> Result<(), CoreError> {
        mask.validate(self.available_cores())?;
        sys::set(worker.executor.tid, mask)
    }

    fn worker_affinity(&self, worker: &WorkerHandle) -> Result<AffinityMask, CoreError> {
        sys::get(worker.executor.tid)
    }
}

#[cfg(not(target_os = "linux"))]
impl AffinityController for SystemAffinity {
    fn available_cores(&self) -> usize {
        host_core_count()
    }

    fn set_process_affinity(&self, mask: &AffinityMask) -> Result<(), CoreError> {
        mask.validate(self.available_cores())?;
        Err(CoreError::UnsupportedPlatform(std::env::consts::OS.to_string()))
    }

    fn process_affinity(&self) -> Result<AffinityMask, CoreError> {
        Err(CoreError::UnsupportedPlatform(std::env::consts::OS.to_string()))
    }

    fn set_worker_affinity(
        &self,
        _worker: &WorkerHandle,
        mask: &AffinityMask,
    ) -> Result<(), CoreError> {
        mask.validate(self.available_cores())?;
        Err(CoreError::UnsupportedPlatform(std::env::consts::OS.to_string()))
    }

    fn worker_affinity(&self, _worker: &WorkerHandle) -> Result<AffinityMask, CoreError> {
        Err(CoreError::UnsupportedPlatform(std::env::consts::OS.to_string()))
    }
}

// ─── No-op controller ────────────────────────────────────────────────────────

/// Controller for hosts without an affinity API: every set/get reports
/// `UnsupportedPlatform`, masks are still validated.
#[derive(Debug, Clone, Copy)]
pub struct UnsupportedAffinity {
    cores: usize,
}

impl UnsupportedAffinity {
    /// Controller reporting the host's core count
    pub fn new() -> Self {
        Self::with_cores(host_core_count())
    }

    /// Controller reporting a fixed core count
    pub fn with_cores(cores: usize) -> Self {
        Self {
            cores: cores.max(1),
        }
    }

    fn unsupported() -> CoreError {
        CoreError::UnsupportedPlatform("affinity control disabled".to_string())
    }
}

impl Default for UnsupportedAffinity {
    fn default() -> Self {
        Self::new()
    }
}

impl AffinityController for UnsupportedAffinity {
    fn available_cores(&self) -> usize {
        self.cores
    }

    fn set_process_affinity(&self, mask: &AffinityMask) -> Result<(), CoreError> {
        mask.validate(self.cores)?;
        Err(Self::unsupported())
    }

    fn process_affinity(&self) -> Result<AffinityMask, CoreError> {
        Err(Self::unsupported())
    }

    fn set_worker_affinity(
        &self,
        _worker: &WorkerHandle,
        mask: &AffinityMask,
    ) -> Result<(), CoreError> {
        mask.validate(self.cores)?;
        Err(Self::unsupported())
    }

    fn worker_affinity(&self, _worker: &WorkerHandle) -> Result<AffinityMask, CoreError> {
        Err(Self::unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_construction() {
        assert!(matches!(
            AffinityMask::new(Vec::new()),
            Err(CoreError::InvalidMask(_))
        ));

        let mask = AffinityMask::new([3, 1, 3]).unwrap();
        assert_eq!(mask.cores().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(mask.first(), 1);
        assert_eq!(mask.to_string(), "[1, 3]");

        assert_eq!(AffinityMask::all(4).len(), 4);
        assert_eq!(AffinityMask::all(0), AffinityMask::single(0));
    }

    #[test]
    fn test_mask_validation() {
        let mask = AffinityMask::new([0, 5]).unwrap();
        assert!(mask.validate(8).is_ok());
        assert!(matches!(mask.validate(4), Err(CoreError::InvalidMask(_))));
    }

    #[test]
    fn test_unsupported_controller() {
        let controller = UnsupportedAffinity::with_cores(2);
        assert_eq!(controller.available_cores(), 2);
        assert!(matches!(
            controller.set_process_affinity(&AffinityMask::single(0)),
            Err(CoreError::UnsupportedPlatform(_))
        ));
        // Bad masks are still rejected as such
        assert!(matches!(
            controller.set_process_affinity(&AffinityMask::single(7)),
            Err(CoreError::InvalidMask(_))
        ));
        assert!(controller.process_affinity().is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_system_pin_round_trip() {
        // Run on a scratch thread so the test harness thread keeps its mask
        std::thread::spawn(|| {
            let controller = SystemAffinity;
            let original = controller.process_affinity().unwrap();
            let target = AffinityMask::single(original.first());

            controller.set_process_affinity(&target).unwrap();
            assert_eq!(controller.process_affinity().unwrap(), target);

            controller.set_process_affinity(&original).unwrap();
            assert_eq!(controller.process_affinity().unwrap(), original);
        })
        .join()
        .unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_system_rejects_missing_core() {
        let controller = SystemAffinity;
        let beyond = AffinityMask::single(controller.available_cores());
        assert!(matches!(
            controller.set_process_affinity(&beyond),
            Err(CoreError::InvalidMask(_))
        ));
    }
}
