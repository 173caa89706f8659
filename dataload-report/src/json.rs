//! JSON Output

use crate::report::RunReport;
use crate::stats::RunStatistics;
use dataload_core::RunSummary;

/// Generate a prettified JSON report.
///
/// Serializes the summary and its statistics into machine-readable JSON.
pub fn generate_json_report(
    summary: &RunSummary,
    stats: &RunStatistics,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&RunReport::new(summary.clone(), stats.clone()))
}

/// Generate a prettified JSON report from an assembled [`RunReport`]
pub fn render_report(report: &RunReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::tests::{failed, record, summary};

    #[test]
    fn test_json_report_round_trips() {
        let run = summary(vec![record(0, "a.csv", 10, 64), failed(1, "b.csv")]);
        let stats = RunStatistics::from_summary(&run);

        let json = generate_json_report(&run, &stats).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.schema_version, RunReport::SCHEMA_VERSION);
        assert_eq!(parsed.summary.records.len(), 2);
        assert_eq!(parsed.statistics.failed, 1);
        assert!(json.contains("\"mode\": \"multi_core\""));
        assert!(json.contains("\"kind\": \"not_found\""));
    }
}
