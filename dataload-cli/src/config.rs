//! Configuration loading from dataload.toml
//!
//! Defaults for the CLI can be kept in a `dataload.toml` file. The file is
//! discovered by walking up from the current directory; command-line flags
//! override whatever it sets.

use dataload_core::{Mode, RunnerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up by [`DataloadConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "dataload.toml";

/// Dataload configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DataloadConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerSection,
    /// Output configuration
    #[serde(default)]
    pub output: OutputSection,
}

/// How files are loaded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunnerSection {
    /// Strategy: "sequential", "single_core" or "multi_core"
    #[serde(default)]
    pub mode: Mode,
    /// Worker count for pooled modes (host core count when unset)
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Core used by single-core mode
    #[serde(default)]
    pub pinned_core: usize,
    /// Read through the prefetch pipeline (sequential only)
    #[serde(default)]
    pub prefetch: bool,
    /// File extension of the inputs
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            jobs: None,
            pinned_core: 0,
            prefetch: false,
            extension: default_extension(),
        }
    }
}

fn default_extension() -> String {
    "csv".to_string()
}

impl RunnerSection {
    /// Core runner configuration for these settings
    pub fn to_runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            mode: self.mode,
            workers: self.jobs,
            pinned_core: self.pinned_core,
            prefetch: self.prefetch,
        }
    }
}

/// Where and how results are written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSection {
    /// Output format: "human", "csv" or "json"
    #[serde(default = "default_format")]
    pub format: String,
    /// Directory for saved reports
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    /// Save a CSV summary after each run
    #[serde(default)]
    pub save_csv: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            format: default_format(),
            directory: default_output_dir(),
            save_csv: false,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl DataloadConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        Self::discover_from(&std::env::current_dir().ok()?)
    }

    /// Walk up from `start` looking for [`CONFIG_FILE_NAME`]
    pub fn discover_from(start: &Path) -> Option<Self> {
        let mut dir = start.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => {
                        tracing::debug!(path = %config_path.display(), "loaded configuration");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %config_path.display(), error = %e, "ignoring invalid configuration");
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# Dataload Configuration

[runner]
# Strategy: "sequential", "single_core" or "multi_core"
mode = "sequential"
# Worker count for single_core/multi_core (uncomment to enable)
# jobs = 4
# Core used by single_core mode
pinned_core = 0
# Read ahead through a bounded prefetch pipeline (sequential only)
prefetch = false
# Extension of the files to load
extension = "csv"

[output]
# Default output format: human, csv, json
format = "human"
# Directory for saved reports
directory = "."
# Save a {mode}_summary_{HHMMSS}.csv after each run
save_csv = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DataloadConfig::default();
        assert_eq!(config.runner.mode, Mode::Sequential);
        assert_eq!(config.runner.extension, "csv");
        assert_eq!(config.output.format, "human");
        assert!(!config.output.save_csv);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [runner]
            mode = "multi_core"
            jobs = 3
        "#;

        let config: DataloadConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.runner.mode, Mode::MultiCoreParallel);
        assert_eq!(config.runner.jobs, Some(3));
        // Defaults should still apply
        assert_eq!(config.runner.extension, "csv");
        assert_eq!(config.output.directory, PathBuf::from("."));

        let runner = config.runner.to_runner_config();
        assert_eq!(runner.workers, Some(3));
        assert_eq!(runner.mode, Mode::MultiCoreParallel);
    }

    #[test]
    fn test_default_toml_parses() {
        let config: DataloadConfig = toml::from_str(&DataloadConfig::default_toml()).unwrap();
        assert_eq!(config, DataloadConfig::default());
    }

    #[test]
    fn test_discover_walks_up() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(
            root.path().join(CONFIG_FILE_NAME),
            "[runner]\nmode = \"single_core\"\npinned_core = 1\n",
        )
        .unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = DataloadConfig::discover_from(&nested).unwrap();
        assert_eq!(config.runner.mode, Mode::SingleCorePinned);
        assert_eq!(config.runner.pinned_core, 1);
    }
}
