//! Benchmark Runner
//!
//! Entry point tying a [`RunnerConfig`] to the matching strategy. The runner
//! validates the configuration before anything is spawned or read, so a bad
//! request never leaves partial side effects behind.

use crate::cancel::CancellationToken;
use crate::error::CoreError;
use crate::recorder::{Mode, RunSummary};
use crate::strategy::{
    ExecutionStrategy, MultiCoreParallel, RunContext, Sequential, SingleCorePinned,
};
use crate::task::LoadTask;
use serde::{Deserialize, Serialize};

/// What to run and how
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Execution strategy
    pub mode: Mode,
    /// Worker-count override for pooled modes
    pub workers: Option<usize>,
    /// Core used by the single-core mode
    pub pinned_core: usize,
    /// Read through the prefetch pipeline (sequential mode only)
    pub prefetch: bool,
}

impl RunnerConfig {
    /// Default configuration for `mode`
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Check option combinations that no strategy accepts
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.prefetch && self.mode != Mode::Sequential {
            return Err(CoreError::InvalidConfiguration(format!(
                "prefetch is only available in sequential mode, not {}",
                self.mode
            )));
        }
        if self.workers == Some(0) {
            return Err(CoreError::InvalidConfiguration(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the strategy this configuration selects
    pub fn strategy(&self) -> Box<dyn ExecutionStrategy> {
        match self.mode {
            Mode::Sequential => Box::new(Sequential {
                prefetch: self.prefetch,
            }),
            Mode::SingleCorePinned => Box::new(SingleCorePinned {
                core: self.pinned_core,
                workers: self.workers,
            }),
            Mode::MultiCoreParallel => Box::new(MultiCoreParallel {
                workers: self.workers,
            }),
        }
    }
}

/// Runs a task list under one configuration
#[derive(Debug)]
pub struct BenchmarkRunner {
    config: RunnerConfig,
    context: RunContext,
}

impl BenchmarkRunner {
    /// Runner using the host's filesystem, affinity API and memory probe
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_context(config, RunContext::system())
    }

    /// Runner with explicit collaborators
    pub fn with_context(config: RunnerConfig, context: RunContext) -> Self {
        Self { config, context }
    }

    /// Active configuration
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Token that stops the run at the next task boundary
    pub fn cancellation_token(&self) -> CancellationToken {
        self.context.cancel.clone()
    }

    /// Execute every task and return the summary
    pub fn run(&self, tasks: Vec<LoadTask>) -> Result<RunSummary, CoreError> {
        if tasks.is_empty() {
            return Err(CoreError::EmptyInput);
        }
        self.config.validate()?;

        let strategy = self.config.strategy();
        tracing::info!(
            mode = %strategy.mode(),
            tasks = tasks.len(),
            workers = ?self.config.workers,
            prefetch = self.config.prefetch,
            "starting run"
        );

        let summary = strategy.run(tasks, &self.context)?;
        tracing::info!(
            mode = %summary.mode,
            records = summary.records.len(),
            failed = summary.failed_count(),
            degraded = summary.degraded,
            cancelled = summary.cancelled,
            wall_ms = summary.wall_time().as_millis() as u64,
            "run finished"
        );
        Ok(summary)
    }
}
