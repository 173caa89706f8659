//! Process memory introspection
//!
//! Linux reads `/proc/self/statm`; other hosts get [`NullMemoryProbe`],
//! which reports zeros rather than failing the run.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Virtual and resident size of the process at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySample {
    /// Total address space reserved
    pub virtual_bytes: u64,
    /// Physical memory currently mapped
    pub resident_bytes: u64,
}

/// Samples the current process's memory footprint
pub trait MemoryProbe: Send + Sync {
    /// Take a sample; returns zeros if the host cannot tell
    fn sample(&self) -> MemorySample;
}

/// Reads `/proc/self/statm`
#[derive(Debug, Clone, Copy)]
pub struct ProcfsMemoryProbe {
    page_size: u64,
}

impl ProcfsMemoryProbe {
    /// Probe using the host page size
    pub fn new() -> Self {
        Self {
            page_size: page_size(),
        }
    }

    /// Parse the first two fields of statm (size, resident; in pages)
    fn parse_statm(content: &str, page_size: u64) -> Option<MemorySample> {
        let mut fields = content.split_whitespace();
        let size: u64 = fields.next()?.parse().ok()?;
        let resident: u64 = fields.next()?.parse().ok()?;
        Some(MemorySample {
            virtual_bytes: size * page_size,
            resident_bytes: resident * page_size,
        })
    }
}

impl Default for ProcfsMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcfsMemoryProbe {
    fn sample(&self) -> MemorySample {
        std::fs::read_to_string("/proc/self/statm")
            .ok()
            .and_then(|content| Self::parse_statm(&content, self.page_size))
            .unwrap_or_default()
    }
}

fn page_size() -> u64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf has no preconditions.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            return size as u64;
        }
    }
    4096
}

/// Probe for hosts without memory introspection
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMemoryProbe;

impl MemoryProbe for NullMemoryProbe {
    fn sample(&self) -> MemorySample {
        MemorySample::default()
    }
}

/// Best probe available on this host
pub fn default_memory_probe() -> Arc<dyn MemoryProbe> {
    if cfg!(target_os = "linux") {
        Arc::new(ProcfsMemoryProbe::new())
    } else {
        Arc::new(NullMemoryProbe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statm() {
        let sample = ProcfsMemoryProbe::parse_statm("2048 512 100 10 0 300 0\n", 4096).unwrap();
        assert_eq!(sample.virtual_bytes, 2048 * 4096);
        assert_eq!(sample.resident_bytes, 512 * 4096);

        assert!(ProcfsMemoryProbe::parse_statm("", 4096).is_none());
        assert!(ProcfsMemoryProbe::parse_statm("abc def", 4096).is_none());
    }

    #[test]
    fn test_null_probe() {
        assert_eq!(NullMemoryProbe.sample(), MemorySample::default());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_procfs_probe_reads_self() {
        let sample = ProcfsMemoryProbe::new().sample();
        assert!(sample.resident_bytes > 0);
        assert!(sample.virtual_bytes >= sample.resident_bytes);
    }
}
