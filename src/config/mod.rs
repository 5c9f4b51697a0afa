//! Job configuration
//!
//! A job is described by an optional YAML file whose fields can each be
//! overridden from the command line. [`JobConfig::resolve`] validates the
//! merged result and turns it into a [`JobPlan`] the runner can execute.
//!
//! ```yaml
//! name: nightly device stats
//! preset: stats-2
//! reference: ./preload/device.csv
//! input: ./input
//! output: ./output
//! workers: 4
//! reducers: 2
//! combiner: true
//! spill_threshold: 10000
//! order: "desc, asc"
//! ```

pub mod validation;

use crate::error::{ErrorCode, Result, StatsError};
use crate::output::OutputTarget;
use crate::pipeline::{ExecutionSettings, JobPreset, JobSpec, DEFAULT_SPILL_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub use validation::{validate_config, ConfigValidationError};

pub const DEFAULT_REFERENCE_PATH: &str = "./preload/device.csv";
pub const DEFAULT_INPUT_PATH: &str = "./input";
pub const DEFAULT_OUTPUT_PATH: &str = "./output";

fn default_reference() -> PathBuf {
    PathBuf::from(DEFAULT_REFERENCE_PATH)
}

fn default_input() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT_PATH)
}

fn default_output() -> String {
    DEFAULT_OUTPUT_PATH.to_string()
}

fn default_reducers() -> usize {
    1
}

fn default_combiner() -> bool {
    true
}

fn default_spill_threshold() -> usize {
    DEFAULT_SPILL_THRESHOLD
}

fn default_preset() -> JobPreset {
    JobPreset::StatsOne
}

/// Job file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Display name; defaults to the preset's job name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default = "default_preset")]
    pub preset: JobPreset,

    /// Reference side file (`id,category`)
    #[serde(default = "default_reference")]
    pub reference: PathBuf,

    /// Input file or directory of shards
    #[serde(default = "default_input")]
    pub input: PathBuf,

    /// Output file, directory, or `-` for stdout
    #[serde(default = "default_output")]
    pub output: String,

    /// Map workers; defaults to the available parallelism
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    #[serde(default = "default_reducers")]
    pub reducers: usize,

    #[serde(default = "default_combiner")]
    pub combiner: bool,

    #[serde(default = "default_spill_threshold")]
    pub spill_threshold: usize,

    /// Field directions replacing the preset ordering, e.g. `"desc, asc"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            name: None,
            preset: default_preset(),
            reference: default_reference(),
            input: default_input(),
            output: default_output(),
            workers: None,
            reducers: default_reducers(),
            combiner: default_combiner(),
            spill_threshold: default_spill_threshold(),
            order: None,
        }
    }
}

/// Command-line values that take precedence over the job file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub name: Option<String>,
    pub preset: Option<JobPreset>,
    pub reference: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub output: Option<String>,
    pub workers: Option<usize>,
    pub reducers: Option<usize>,
    pub no_combiner: bool,
    pub spill_threshold: Option<usize>,
    pub order: Option<String>,
}

/// A validated job, ready to run
#[derive(Debug, Clone, PartialEq)]
pub struct JobPlan {
    pub name: String,
    pub preset: JobPreset,
    pub spec: JobSpec,
    pub reference: PathBuf,
    pub input: PathBuf,
    pub output: OutputTarget,
    pub settings: ExecutionSettings,
}

impl JobConfig {
    /// Load a job file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            let code = if e.kind() == std::io::ErrorKind::NotFound {
                ErrorCode::CONFIG_NOT_FOUND
            } else {
                ErrorCode::CONFIG_GENERIC
            };
            StatsError::config_with_code(
                code,
                format!("Cannot read job file '{}'", path.display()),
            )
            .with_source(e)
        })?;
        debug!(path = %path.display(), "Loaded job file");
        Self::from_yaml_str(&content)
            .map_err(|e| e.with_context(format!("in job file '{}'", path.display())))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply command-line overrides on top of the file values
    pub fn apply_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(name) = overrides.name {
            self.name = Some(name);
        }
        if let Some(preset) = overrides.preset {
            self.preset = preset;
        }
        if let Some(reference) = overrides.reference {
            self.reference = reference;
        }
        if let Some(input) = overrides.input {
            self.input = input;
        }
        if let Some(output) = overrides.output {
            self.output = output;
        }
        if let Some(workers) = overrides.workers {
            self.workers = Some(workers);
        }
        if let Some(reducers) = overrides.reducers {
            self.reducers = reducers;
        }
        if overrides.no_combiner {
            self.combiner = false;
        }
        if let Some(spill_threshold) = overrides.spill_threshold {
            self.spill_threshold = spill_threshold;
        }
        if let Some(order) = overrides.order {
            self.order = Some(order);
        }
        self
    }

    /// Validate and turn the configuration into a runnable plan
    pub fn resolve(self) -> Result<JobPlan> {
        let ordering = validate_config(&self)?;

        let mut spec = self.preset.spec();
        if let Some(ordering) = ordering {
            spec.ordering = ordering;
        }

        let defaults = ExecutionSettings::default();
        let settings = ExecutionSettings {
            workers: self.workers.unwrap_or(defaults.workers),
            reducers: self.reducers,
            combiner: self.combiner,
            spill_threshold: self.spill_threshold,
        };

        Ok(JobPlan {
            name: self
                .name
                .unwrap_or_else(|| self.preset.default_job_name().to_string()),
            preset: self.preset,
            spec,
            reference: self.reference,
            input: self.input,
            output: OutputTarget::from(self.output),
            settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{AggregateKind, SortOrder};
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = JobConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, JobConfig::default());
        assert_eq!(config.reference, PathBuf::from("./preload/device.csv"));
        assert!(config.combiner);
    }

    #[test]
    fn test_parse_full_job_file() {
        let yaml = r#"
name: nightly
preset: stats-2
reference: ref.csv
input: shards
output: "-"
workers: 3
reducers: 2
combiner: false
spill_threshold: 50
order: "asc, asc"
"#;
        let config = JobConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.preset, JobPreset::StatsTwo);
        assert_eq!(config.workers, Some(3));
        assert!(!config.combiner);

        let plan = config.resolve().unwrap();
        assert_eq!(plan.name, "nightly");
        assert_eq!(plan.output, OutputTarget::Stdout);
        assert_eq!(plan.spec.aggregate, AggregateKind::Mean);
        assert_eq!(
            plan.spec.ordering.fields,
            vec![SortOrder::Ascending, SortOrder::Ascending]
        );
        assert_eq!(plan.settings.workers, 3);
        assert_eq!(plan.settings.reducers, 2);
        assert_eq!(plan.settings.spill_threshold, 50);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = JobConfig::from_yaml_str("reducer: 2").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_YAML);
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        assert!(JobConfig::from_yaml_str("preset: stats-3").is_err());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config = JobConfig::from_yaml_str("preset: stats-2\nreducers: 4").unwrap();
        let plan = config
            .apply_overrides(ConfigOverrides {
                preset: Some(JobPreset::StatsOne),
                output: Some("out.tsv".to_string()),
                no_combiner: true,
                ..ConfigOverrides::default()
            })
            .resolve()
            .unwrap();

        assert_eq!(plan.preset, JobPreset::StatsOne);
        assert_eq!(plan.name, "device stats 1");
        assert_eq!(plan.settings.reducers, 4);
        assert!(!plan.settings.combiner);
        assert_eq!(plan.output, OutputTarget::Path(PathBuf::from("out.tsv")));
    }

    #[test]
    fn test_resolve_reports_validation_errors() {
        let config = JobConfig {
            reducers: 0,
            ..JobConfig::default()
        };
        let err = config.resolve().unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_VALIDATION_FAILED);
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("job.yml");
        std::fs::write(&path, "preset: stats-2\nworkers: 2\n").unwrap();

        let config = JobConfig::load(&path).await.unwrap();
        assert_eq!(config.preset, JobPreset::StatsTwo);
        assert_eq!(config.workers, Some(2));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = JobConfig::load(Path::new("/nonexistent/job.yml"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);
    }
}
