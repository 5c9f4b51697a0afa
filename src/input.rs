//! Input shard discovery

use crate::error::{ErrorCode, Result, StatsError};
use crate::pipeline::Shard;
use std::path::Path;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Turn an input path into map shards
///
/// A file is a single shard. A directory contributes every regular file below
/// it, in path order. Hidden and marker entries are skipped, and so is
/// everything inside a hidden or marker directory.
pub fn discover_shards(input: &Path) -> Result<Vec<Shard>> {
    if !input.exists() {
        return Err(StatsError::storage_with_code(
            ErrorCode::STORAGE_NOT_FOUND,
            "Input path does not exist",
            Some(input.to_path_buf()),
        ));
    }

    if input.is_file() {
        return Ok(vec![Shard::File(input.to_path_buf())]);
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(input)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(input).to_path_buf();
            StatsError::storage_with_code(
                ErrorCode::STORAGE_INPUT_UNREADABLE,
                "Input directory could not be walked",
                Some(path),
            )
            .with_source(e)
        })?;

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    debug!(input = %input.display(), shards = files.len(), "Discovered input shards");
    Ok(files.into_iter().map(Shard::File).collect())
}

/// Hidden (`.`) and marker (`_`) entries, such as `_SUCCESS` or `_temporary/`
fn is_hidden(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_')
}
