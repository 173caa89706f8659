//! Report Data Structures

use crate::stats::RunStatistics;
use chrono::{DateTime, Local, Utc};
use dataload_core::{Mode, RunSummary};
use serde::{Deserialize, Serialize};

/// Host the run executed on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system family (`linux`, `macos`, ...)
    pub os: String,
    /// Kernel/OS release string
    pub os_release: String,
    /// CPU architecture
    pub arch: String,
    /// CPU model name
    pub cpu_model: String,
    /// Online logical cores
    pub logical_cores: usize,
    /// Physical memory, 0 when unknown
    pub memory_total_bytes: u64,
}

/// Complete persisted report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Report layout version
    pub schema_version: u32,
    /// Tool version that produced the report
    pub version: String,
    /// Host description, when collected
    pub system: Option<SystemInfo>,
    /// Raw per-task records and run metadata
    pub summary: RunSummary,
    /// Aggregates derived from `summary`
    pub statistics: RunStatistics,
}

impl RunReport {
    /// Current report layout version
    pub const SCHEMA_VERSION: u32 = 1;

    /// Bundle a summary with its statistics
    pub fn new(summary: RunSummary, statistics: RunStatistics) -> Self {
        Self {
            schema_version: Self::SCHEMA_VERSION,
            version: env!("CARGO_PKG_VERSION").to_string(),
            system: None,
            summary,
            statistics,
        }
    }

    /// Attach host information
    pub fn with_system(mut self, system: SystemInfo) -> Self {
        self.system = Some(system);
        self
    }
}

/// File name for a saved report: `{mode}_summary_{HHMMSS}.{extension}`,
/// with the end time in local time like the rendered timestamps
pub fn default_report_name(mode: Mode, end_time: DateTime<Utc>, extension: &str) -> String {
    format!(
        "{}_summary_{}.{}",
        mode.as_str(),
        end_time.with_timezone(&Local).format("%H%M%S"),
        extension.trim_start_matches('.')
    )
}
