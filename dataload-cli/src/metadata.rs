//! System Metadata Collection
//!
//! Describes the host a run executes on:
//!
//! - **OS**: family, kernel release and architecture
//! - **CPU**: model name and online logical cores
//! - **Memory**: total physical RAM
//!
//! Linux-specific data (release, CPU model, memory) gracefully degrades on
//! other platforms, returning "Unknown" or 0 values.

use dataload_core::host_core_count;
use dataload_report::SystemInfo;

/// Collect host information for the report banner
pub fn collect_system_info() -> SystemInfo {
    SystemInfo {
        os: std::env::consts::OS.to_string(),
        os_release: get_os_release().unwrap_or_else(|| "Unknown".to_string()),
        arch: std::env::consts::ARCH.to_string(),
        cpu_model: get_cpu_model().unwrap_or_else(|| "Unknown".to_string()),
        logical_cores: host_core_count(),
        memory_total_bytes: get_memory_bytes().unwrap_or(0),
    }
}

/// Kernel release from /proc (Linux only)
fn get_os_release() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/sys/kernel/osrelease")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Get CPU model name from /proc/cpuinfo (Linux only)
fn get_cpu_model() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo")
            .ok()
            .and_then(|content| parse_cpu_model(&content))
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Get total system memory in bytes (Linux only)
fn get_memory_bytes() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|content| parse_mem_total(&content))
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

// x86 reports "model name"; some ARM kernels only "Hardware" or "Processor"
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    ["model name", "Hardware", "Processor"].iter().find_map(|key| {
        cpuinfo
            .lines()
            .find(|l| l.starts_with(key))
            .and_then(|l| l.split(':').nth(1))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_mem_total(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|l| l.starts_with("MemTotal"))
        .and_then(|l| {
            l.split_whitespace()
                .nth(1)
                .and_then(|s| s.parse::<u64>().ok())
        })
        .map(|kb| kb * 1024)
}
