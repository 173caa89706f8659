//! CSV Output
//!
//! One row per record. Run-level columns repeat on every row so each row
//! stands alone when files from several runs are concatenated.

use crate::human::clock_time;
use crate::stats::RunStatistics;
use dataload_core::RunSummary;

const HEADER: [&str; 16] = [
    "file",
    "executor",
    "start",
    "end",
    "duration_s",
    "bytes",
    "virtual_bytes",
    "resident_bytes",
    "success",
    "error",
    "mode",
    "program_start",
    "first_load_start",
    "last_load_end",
    "program_end",
    "total_s",
];

/// Render the summary as CSV
pub fn generate_csv_report(summary: &RunSummary) -> String {
    let stats = RunStatistics::from_summary(summary);
    let mut output = String::new();
    push_row(&mut output, HEADER.iter().map(|h| h.to_string()));

    let run_columns = [
        summary.mode.to_string(),
        clock_time(summary.program_start),
        stats.first_load_start.map(clock_time).unwrap_or_default(),
        stats.last_load_end.map(clock_time).unwrap_or_default(),
        clock_time(summary.program_end),
        format!("{:.6}", stats.wall_time_secs),
    ];

    for record in &summary.records {
        let columns = [
            record.file_name(),
            record.executor.to_string(),
            clock_time(record.start_time),
            clock_time(record.end_time),
            format!("{:.6}", record.duration.as_secs_f64()),
            record.bytes_read.to_string(),
            record.virtual_memory_bytes.to_string(),
            record.resident_memory_bytes.to_string(),
            record.success.to_string(),
            record
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default(),
        ];
        push_row(
            &mut output,
            columns.into_iter().chain(run_columns.iter().cloned()),
        );
    }

    output
}

fn push_row(output: &mut String, fields: impl Iterator<Item = String>) {
    let row: Vec<String> = fields.map(|f| escape(&f)).collect();
    output.push_str(&row.join(","));
    output.push('\n');
}

/// Quote a field if it contains a separator, quote or line break
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
