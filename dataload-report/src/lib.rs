#![warn(missing_docs)]
//! Dataload Report - Statistics and Output Formats
//!
//! Turns a [`RunSummary`](dataload_core::RunSummary) into:
//! - Human-readable terminal output
//! - CSV (one row per file, spreadsheet-compatible)
//! - JSON (machine-readable, full schema)

mod csv;
mod human;
mod json;
mod report;
mod stats;

pub use csv::generate_csv_report;
pub use human::{clock_time, format_human_output, format_system_info};
pub use json::{generate_json_report, render_report};
pub use report::{RunReport, SystemInfo, default_report_name};
pub use stats::{DurationSummary, RunStatistics, compute_percentile};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Human,
    /// CSV for spreadsheets
    Csv,
    /// JSON with full schema
    Json,
}

impl OutputFormat {
    /// File extension for saved reports
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Human => "txt",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("human".parse::<OutputFormat>().unwrap(), OutputFormat::Human);
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("html".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.extension(), "json");
    }
}
