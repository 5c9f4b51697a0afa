//! Result formatting and all-or-nothing output
//!
//! Results are rendered as `key\tvalue` lines. File output is written to a
//! temporary file next to the destination and renamed into place only after
//! every line has been written, so a failed run never leaves partial output.

use crate::error::{ErrorCode, Result, StatsError};
use crate::pipeline::GroupResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name used when the output target is a directory
pub const PART_FILE_NAME: &str = "part-r-00000";

/// Where results are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputTarget {
    Stdout,
    /// A file, or a directory that receives [`PART_FILE_NAME`]
    Path(PathBuf),
}

impl From<String> for OutputTarget {
    fn from(value: String) -> Self {
        if value == "-" {
            Self::Stdout
        } else {
            Self::Path(PathBuf::from(value))
        }
    }
}

impl From<OutputTarget> for String {
    fn from(target: OutputTarget) -> Self {
        target.to_string()
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("-"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl OutputTarget {
    /// Resolve the file that will hold the results
    ///
    /// Existing files and paths with an extension are written directly. Any
    /// other path is a directory that receives [`PART_FILE_NAME`].
    pub fn file_path(&self) -> Option<PathBuf> {
        match self {
            Self::Stdout => None,
            Self::Path(path) => {
                let names_dir = path.as_os_str().to_string_lossy().ends_with(['/', '\\']);
                let names_file = path.is_file() || (!names_dir && path.extension().is_some());
                if names_file && !path.is_dir() {
                    Some(path.clone())
                } else {
                    Some(path.join(PART_FILE_NAME))
                }
            }
        }
    }
}

/// Format an aggregate as a decimal number that always carries a point
pub fn format_value(value: f64) -> String {
    let formatted = value.to_string();
    if value.is_finite() && !formatted.contains('.') {
        format!("{}.0", formatted)
    } else {
        formatted
    }
}

/// Render results as `key\tvalue` lines
pub fn render(results: &[GroupResult]) -> String {
    let mut out = String::new();
    for result in results {
        out.push_str(&result.key);
        out.push('\t');
        out.push_str(&format_value(result.aggregate));
        out.push('\n');
    }
    out
}

/// Write results to the target, returning the file written if any
pub fn write_results(results: &[GroupResult], target: &OutputTarget) -> Result<Option<PathBuf>> {
    let rendered = render(results);
    match target.file_path() {
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .and_then(|_| stdout.flush())
                .map_err(|e| output_error(e, None))?;
            Ok(None)
        }
        Some(path) => {
            write_atomically(&path, rendered.as_bytes())?;
            debug!(path = %path.display(), lines = results.len(), "Wrote results");
            Ok(Some(path))
        }
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| output_error(e, Some(path)))?;

    let mut file =
        tempfile::NamedTempFile::new_in(&parent).map_err(|e| output_error(e, Some(path)))?;
    file.write_all(contents)
        .and_then(|_| file.flush())
        .map_err(|e| output_error(e, Some(path)))?;
    file.persist(path)
        .map_err(|e| output_error(e.error, Some(path)))?;
    Ok(())
}

fn output_error(err: std::io::Error, path: Option<&Path>) -> StatsError {
    StatsError::storage_with_code(
        ErrorCode::STORAGE_OUTPUT_FAILED,
        "Results could not be written",
        path.map(Path::to_path_buf),
    )
    .with_source(err)
}
