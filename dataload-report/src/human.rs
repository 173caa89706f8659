//! Output Formatting
//!
//! Human-readable output for a finished run:
//! - Host banner and mode line
//! - Program/load timeline in local wall-clock time
//! - Per-file table with executor, timing, size and RSS (✓/✗ status)
//! - Failures, warnings, duration statistics and throughput

use crate::report::SystemInfo;
use crate::stats::RunStatistics;
use bytesize::ByteSize;
use chrono::{DateTime, Local, Utc};
use dataload_core::RunSummary;

/// Local wall-clock time with microseconds, e.g. `14:03:07.120391`
pub fn clock_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%H:%M:%S%.6f").to_string()
}

/// Format host information as a short block
pub fn format_system_info(system: &SystemInfo) -> String {
    let mut output = String::new();
    output.push_str("System\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&format!("  OS:      {} {} ({})\n", system.os, system.os_release, system.arch));
    output.push_str(&format!("  CPU:     {}\n", system.cpu_model));
    output.push_str(&format!("  Cores:   {}\n", system.logical_cores));
    if system.memory_total_bytes > 0 {
        output.push_str(&format!("  Memory:  {}\n", ByteSize::b(system.memory_total_bytes)));
    }
    output
}

/// Format a run for terminal display
pub fn format_human_output(
    summary: &RunSummary,
    stats: &RunStatistics,
    system: Option<&SystemInfo>,
) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Dataload Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    if let Some(system) = system {
        output.push_str(&format_system_info(system));
        output.push('\n');
    }

    let mut mode_line = format!(
        "Mode: {} ({} worker{})",
        summary.mode,
        summary.worker_count,
        if summary.worker_count == 1 { "" } else { "s" }
    );
    if summary.prefetch {
        mode_line.push_str(", prefetch");
    }
    if let Some(mask) = &summary.affinity {
        mode_line.push_str(&format!(", affinity {}", mask));
    }
    if summary.degraded {
        mode_line.push_str(", DEGRADED (unpinned)");
    }
    if summary.cancelled {
        mode_line.push_str(", CANCELLED");
    }
    output.push_str(&mode_line);
    output.push('\n');

    let missing = || "-".to_string();
    output.push_str(&format!("  program start:     {}\n", clock_time(summary.program_start)));
    output.push_str(&format!(
        "  first load start:  {}\n",
        stats.first_load_start.map(clock_time).unwrap_or_else(missing)
    ));
    output.push_str(&format!(
        "  last load end:     {}\n",
        stats.last_load_end.map(clock_time).unwrap_or_else(missing)
    ));
    output.push_str(&format!("  program end:       {}\n\n", clock_time(summary.program_end)));

    // Per-file table
    let file_width = summary
        .records
        .iter()
        .map(|r| r.file_name().chars().count())
        .max()
        .unwrap_or(4)
        .max(4);
    let executor_width = summary
        .records
        .iter()
        .map(|r| r.executor.to_string().chars().count())
        .max()
        .unwrap_or(8)
        .max(8);

    output.push_str(&format!(
        "    {:<fw$}  {:<ew$}  {:<15}  {:<15}  {:>12}  {:>10}  {:>10}\n",
        "File",
        "Executor",
        "Start",
        "End",
        "Duration (s)",
        "Size",
        "RSS",
        fw = file_width,
        ew = executor_width
    ));
    output.push_str(&format!(
        "  {}\n",
        "-".repeat(file_width + executor_width + 81)
    ));

    for record in &summary.records {
        let (icon, size) = if record.success {
            ("✓", ByteSize::b(record.bytes_read).to_string())
        } else {
            ("✗", "-".to_string())
        };
        output.push_str(&format!(
            "  {} {:<fw$}  {:<ew$}  {:<15}  {:<15}  {:>12.6}  {:>10}  {:>10}\n",
            icon,
            record.file_name(),
            record.executor.to_string(),
            clock_time(record.start_time),
            clock_time(record.end_time),
            record.duration.as_secs_f64(),
            size,
            ByteSize::b(record.resident_memory_bytes).to_string(),
            fw = file_width,
            ew = executor_width
        ));
    }

    let failures: Vec<_> = summary.failed().collect();
    if !failures.is_empty() {
        output.push_str(&format!("\nFailed ({}):\n", failures.len()));
        for record in failures {
            let reason = record
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            output.push_str(&format!("  ✗ {}: {}\n", record.path.display(), reason));
        }
    }

    if !summary.warnings.is_empty() {
        output.push_str(&format!("\nWarnings ({}):\n", summary.warnings.len()));
        for warning in &summary.warnings {
            output.push_str(&format!("  ! {}\n", warning));
        }
    }

    output.push('\n');
    let d = &stats.durations;
    if d.count > 0 {
        output.push_str(&format!(
            "Durations: mean {:.6} s  median {:.6} s  stddev {:.6} s\n",
            d.mean, d.median, d.std_dev
        ));
        output.push_str(&format!(
            "           min {:.6} s  max {:.6} s  p95 {:.6} s  p99 {:.6} s\n",
            d.min, d.max, d.p95, d.p99
        ));
    }
    output.push_str(&format!(
        "Loaded: {} of {} files, {} ({}/s), peak RSS {}\n",
        stats.succeeded,
        stats.total_tasks,
        ByteSize::b(stats.bytes_read),
        ByteSize::b(stats.throughput_bytes_per_sec as u64),
        ByteSize::b(stats.peak_resident_bytes)
    ));
    output.push_str(&format!("Total process time: {:.6} s\n", stats.wall_time_secs));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::tests::{failed, record, summary};
    use dataload_core::{AffinityMask, RunWarning};

    #[test]
    fn test_output_lists_every_record() {
        let run = summary(vec![
            record(0, "alpha.csv", 120, 2048),
            failed(1, "beta.csv"),
            record(2, "gamma.csv", 80, 4096),
        ]);
        let stats = RunStatistics::from_summary(&run);
        let output = format_human_output(&run, &stats, None);

        assert!(output.contains("Mode: multi_core (2 workers)"));
        assert!(output.contains("✓ alpha.csv"));
        assert!(output.contains("✗ beta.csv"));
        assert!(output.contains("0.120000"));
        assert!(output.contains("Failed (1):"));
        assert!(output.contains("/data/beta.csv: file not found"));
        assert!(output.contains("Loaded: 2 of 3 files"));
        assert!(output.contains("Total process time: 2.000000 s"));
        assert!(!output.contains("System\n"));
    }

    #[test]
    fn test_flags_and_warnings_are_shown() {
        let mut run = summary(vec![record(0, "a.csv", 1, 1)]);
        run.degraded = true;
        run.affinity = Some(AffinityMask::single(0));
        run.warnings.push(RunWarning::AffinityUnsupported {
            detail: "affinity control disabled".to_string(),
        });
        let system = SystemInfo {
            os: "linux".to_string(),
            os_release: "6.1.0".to_string(),
            arch: "x86_64".to_string(),
            cpu_model: "Test CPU".to_string(),
            logical_cores: 8,
            memory_total_bytes: 0,
        };

        let output = format_human_output(&run, &RunStatistics::from_summary(&run), Some(&system));
        assert!(output.contains("affinity [0], DEGRADED (unpinned)"));
        assert!(output.contains("Warnings (1):"));
        assert!(output.contains("affinity unsupported, running unpinned"));
        assert!(output.contains("CPU:     Test CPU"));
        assert!(!output.contains("Memory:"));
    }

    #[test]
    fn test_clock_time_has_microseconds() {
        let formatted = clock_time(Utc::now());
        let (_, fraction) = formatted.split_once('.').unwrap();
        assert_eq!(fraction.len(), 6);
        assert_eq!(formatted.matches(':').count(), 2);
    }
}
