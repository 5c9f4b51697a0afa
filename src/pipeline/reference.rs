//! Reference table used for the map-side join
//!
//! Every worker builds its own [`ReferenceTable`] from the side file before it
//! processes a single record. The table is immutable once built and is handed
//! to the [`RecordFilterJoin`](super::record::RecordFilterJoin) by reference.

use crate::error::{ErrorCode, Result, StatsError};
use csv::{ByteRecord, ReaderBuilder};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Outcome counts from loading a reference side file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows accepted into the table (including overwrites)
    pub rows: u64,
    /// Rows with fewer than two fields, a non-integer id, or invalid UTF-8
    pub skipped: u64,
    /// Rows whose id was already present; the later row wins
    pub overwritten: u64,
}

/// Immutable mapping of device id to category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTable {
    categories: HashMap<i64, String>,
    report: LoadReport,
}

impl ReferenceTable {
    /// Load the table from a comma-separated side file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            StatsError::storage_with_code(
                ErrorCode::STORAGE_REFERENCE_UNREADABLE,
                "Reference table could not be opened",
                Some(path.to_path_buf()),
            )
            .with_source(e)
        })?;

        let table = Self::from_reader(file).map_err(|e| e.with_path(path))?;
        debug!(
            path = %path.display(),
            ids = table.len(),
            skipped = table.report.skipped,
            "Loaded reference table"
        );
        Ok(table)
    }

    /// Load the table from any reader producing `id,category,...` lines
    ///
    /// Only the first two fields of a row are used. Quoting is disabled so a
    /// row splits on every comma.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);

        let mut table = Self::default();
        let mut record = ByteRecord::new();
        while csv_reader.read_byte_record(&mut record)? {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            match parse_row(&record) {
                Some((id, category)) => table.insert(id, category),
                None => {
                    trace!(line, "Skipping malformed reference row");
                    table.report.skipped += 1;
                }
            }
        }

        if table.report.skipped > 0 {
            warn!(
                skipped = table.report.skipped,
                "Reference table contained rows that could not be used"
            );
        }

        Ok(table)
    }

    /// Build a table from in-memory rows, applying the same last-write-wins rule
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for (id, category) in rows {
            table.insert(id, category.into());
        }
        table
    }

    fn insert(&mut self, id: i64, category: String) {
        self.report.rows += 1;
        if self.categories.insert(id, category).is_some() {
            self.report.overwritten += 1;
        }
    }

    /// Look up the category for a device id
    pub fn category(&self, id: i64) -> Option<&str> {
        self.categories.get(&id).map(String::as_str)
    }

    /// Number of distinct ids in the table
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Counts gathered while the table was built
    pub fn report(&self) -> LoadReport {
        self.report
    }
}

fn parse_row(record: &ByteRecord) -> Option<(i64, String)> {
    if record.len() < 2 {
        return None;
    }
    let id = std::str::from_utf8(record.get(0)?).ok()?.parse::<i64>().ok()?;
    let category = std::str::from_utf8(record.get(1)?).ok()?.to_string();
    Some((id, category))
}
