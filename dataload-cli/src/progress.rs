//! Progress reporting while a run executes

use dataload_core::{RecordObserver, TaskRecord};
use indicatif::{ProgressBar, ProgressStyle};

/// Advances a progress bar once per recorded task
pub struct ProgressObserver {
    pb: ProgressBar,
}

impl ProgressObserver {
    /// Visible bar for `total` tasks, drawn on stderr
    pub fn new(total: usize) -> Self {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { pb }
    }

    /// Bar that counts but never draws
    pub fn hidden(total: usize) -> Self {
        let pb = ProgressBar::hidden();
        pb.set_length(total as u64);
        Self { pb }
    }

    /// Tasks recorded so far
    pub fn position(&self) -> u64 {
        self.pb.position()
    }

    /// Clear the bar once the run is over
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl RecordObserver for ProgressObserver {
    fn on_record(&self, record: &TaskRecord) {
        let marker = if record.success { "" } else { " (failed)" };
        self.pb.set_message(format!("{}{}", record.file_name(), marker));
        self.pb.inc(1);
    }
}
