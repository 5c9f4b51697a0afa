//! Job configuration validation using stillwater for error accumulation
//!
//! Every problem in a job file is reported at once instead of stopping at the
//! first one.

use super::JobConfig;
use crate::error::{ErrorCode, Result, StatsError};
use crate::pipeline::KeyOrdering;
use std::path::PathBuf;
use stillwater::Validation;

/// Problems found in an otherwise well-formed job file
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    ZeroWorkers,
    ZeroReducers,
    ZeroSpillThreshold,
    EmptyName,
    InputIsOutput(PathBuf),
    InvalidOrder { order: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroWorkers => write!(f, "workers must be greater than 0"),
            Self::ZeroReducers => write!(f, "reducers must be greater than 0"),
            Self::ZeroSpillThreshold => write!(f, "spill_threshold must be greater than 0"),
            Self::EmptyName => write!(f, "name cannot be empty when provided"),
            Self::InputIsOutput(p) => {
                write!(f, "output '{}' would overwrite the input", p.display())
            }
            Self::InvalidOrder { order, reason } => {
                write!(f, "order '{}' is invalid: {}", order, reason)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Validate a job file, turning all accumulated problems into one error
pub fn validate_config(config: &JobConfig) -> Result<Option<KeyOrdering>> {
    match validate_config_internal(config).into_result() {
        Ok(ordering) => Ok(ordering),
        Err(errors) => Err(StatsError::config_with_code(
            ErrorCode::CONFIG_VALIDATION_FAILED,
            format!(
                "Job configuration validation failed:\n{}",
                errors
                    .iter()
                    .map(|e| format!("  - {}", e))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        )),
    }
}

/// Check every field, returning the parsed ordering override on success
fn validate_config_internal(
    config: &JobConfig,
) -> Validation<Option<KeyOrdering>, Vec<ConfigValidationError>> {
    let mut errors = Vec::new();

    if config.workers == Some(0) {
        errors.push(ConfigValidationError::ZeroWorkers);
    }
    if config.reducers == 0 {
        errors.push(ConfigValidationError::ZeroReducers);
    }
    if config.spill_threshold == 0 {
        errors.push(ConfigValidationError::ZeroSpillThreshold);
    }
    if matches!(config.name.as_deref(), Some(name) if name.trim().is_empty()) {
        errors.push(ConfigValidationError::EmptyName);
    }
    if config.output != "-" && PathBuf::from(&config.output) == config.input {
        errors.push(ConfigValidationError::InputIsOutput(config.input.clone()));
    }

    let ordering = match config.order.as_deref() {
        None => None,
        Some(order) => {
            let separator = config.preset.spec().ordering.separator;
            match KeyOrdering::parse(separator, order) {
                Ok(ordering) => Some(ordering),
                Err(e) => {
                    errors.push(ConfigValidationError::InvalidOrder {
                        order: order.to_string(),
                        reason: e.to_string(),
                    });
                    None
                }
            }
        }
    };

    if errors.is_empty() {
        Validation::success(ordering)
    } else {
        Validation::failure(errors)
    }
}
