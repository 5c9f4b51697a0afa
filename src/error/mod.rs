use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// The unified error type for devstats
///
/// Only run-level failures live here. Problems with a single input record are
/// reported through [`RecordError`] and never abort a run.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Storage error: {message}")]
    Storage {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Internal error: {message}")]
    Internal {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StatsError {
    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error with specific code and path
    pub fn storage_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create an internal error with specific code
    pub fn internal_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Internal {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Storage { source: src, .. }
            | Self::Internal { source: src, .. } => {
                *src = Some(source.into());
            }
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::Storage { message, .. }
            | Self::Internal { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Attach the offending path to a storage error
    pub fn with_path(mut self, new_path: impl Into<PathBuf>) -> Self {
        if let Self::Storage { ref mut path, .. } = self {
            *path = Some(new_path.into());
        }
        self
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Storage { .. } => 4,
            Self::Internal { .. } => 1,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. } | Self::Storage { code, .. } | Self::Internal { code, .. } => {
                *code
            }
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, .. } => format!("Configuration problem: {}", message),
            Self::Storage { message, path, .. } => {
                if let Some(p) = path {
                    format!("Storage error at {}: {}", p.display(), message)
                } else {
                    format!("Storage error: {}", message)
                }
            }
            Self::Internal { message, .. } => {
                format!("Internal error (this is a bug): {}", message)
            }
        }
    }
}

/// Type alias for Results using StatsError
pub type Result<T> = std::result::Result<T, StatsError>;

impl From<std::io::Error> for StatsError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let (code, message) = match err.kind() {
            ErrorKind::NotFound => (ErrorCode::STORAGE_NOT_FOUND, "File or directory not found"),
            ErrorKind::PermissionDenied => {
                (ErrorCode::STORAGE_PERMISSION_DENIED, "Permission denied")
            }
            ErrorKind::AlreadyExists => (ErrorCode::STORAGE_ALREADY_EXISTS, "Already exists"),
            _ => (ErrorCode::STORAGE_IO_ERROR, "IO operation failed"),
        };

        StatsError::storage_with_code(code, message, None).with_source(err)
    }
}

impl From<serde_yaml::Error> for StatsError {
    fn from(err: serde_yaml::Error) -> Self {
        StatsError::config_with_code(ErrorCode::CONFIG_INVALID_YAML, "Invalid YAML syntax")
            .with_source(err)
    }
}

impl From<csv::Error> for StatsError {
    fn from(err: csv::Error) -> Self {
        StatsError::storage_with_code(
            ErrorCode::STORAGE_REFERENCE_UNREADABLE,
            "Reference table could not be read",
            None,
        )
        .with_source(err)
    }
}

/// Why a single raw record was rejected as malformed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("expected 3 fields, found {found}")]
    FieldCount { found: usize },

    #[error("id '{raw}' is not an integer")]
    InvalidId { raw: String },

    #[error("value '{raw}' is not a finite number")]
    InvalidValue { raw: String },

    #[error("record is not valid UTF-8")]
    InvalidUtf8,
}

impl RecordError {
    /// Get the error code for this record error
    pub fn code(&self) -> u16 {
        match self {
            Self::FieldCount { .. } => ErrorCode::RECORD_FIELD_COUNT,
            Self::InvalidId { .. } => ErrorCode::RECORD_INVALID_ID,
            Self::InvalidValue { .. } => ErrorCode::RECORD_INVALID_VALUE,
            Self::InvalidUtf8 => ErrorCode::RECORD_INVALID_UTF8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation_and_chaining() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "device.csv");
        let err = StatsError::storage_with_code(
            ErrorCode::STORAGE_REFERENCE_UNREADABLE,
            "Cannot read reference table",
            None,
        )
        .with_source(io_err)
        .with_context("while starting worker 0");

        assert_eq!(err.code(), ErrorCode::STORAGE_REFERENCE_UNREADABLE);
        assert!(err.to_string().contains("[E3020]"));
        assert!(err.user_message().contains("Cannot read reference table"));
        assert!(err.user_message().contains("worker 0"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = StatsError::from(io_err).with_path("/data/preload/device.csv");

        assert_eq!(err.code(), ErrorCode::STORAGE_NOT_FOUND);
        assert_eq!(err.exit_code(), 4);
        assert!(err.user_message().contains("/data/preload/device.csv"));
    }

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(
            StatsError::config_with_code(ErrorCode::CONFIG_GENERIC, "bad").exit_code(),
            2
        );
        assert_eq!(
            StatsError::storage_with_code(ErrorCode::STORAGE_IO_ERROR, "bad", None).exit_code(),
            4
        );
        assert_eq!(
            StatsError::internal_with_code(ErrorCode::INTERNAL_EMPTY_GROUP, "empty").exit_code(),
            1
        );
    }

    #[test]
    fn test_record_error_codes() {
        assert_eq!(
            RecordError::FieldCount { found: 2 }.code(),
            ErrorCode::RECORD_FIELD_COUNT
        );
        assert_eq!(
            RecordError::InvalidValue {
                raw: "abc".to_string()
            }
            .to_string(),
            "value 'abc' is not a finite number"
        );
    }
}
