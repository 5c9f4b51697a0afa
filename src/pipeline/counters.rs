//! Record accounting shared by workers and the driver

use super::record::{FilterReason, MapOutcome};
use super::reference::LoadReport;
use serde::{Deserialize, Serialize};
use stillwater::{Monoid, Semigroup};

/// Counts of what happened to every record a run saw
///
/// Each worker keeps its own counters; the driver merges them with
/// `Semigroup::combine`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropCounters {
    pub records_read: u64,
    pub emitted: u64,
    pub malformed: u64,
    pub filtered_id_range: u64,
    pub filtered_flag: u64,
    pub join_misses: u64,
    pub reference_rows_skipped: u64,
    pub reference_ids_overwritten: u64,
}

impl DropCounters {
    /// Account for one classified record
    pub fn record(&mut self, outcome: &MapOutcome) {
        self.records_read += 1;
        match outcome {
            MapOutcome::Emit(_) => self.emitted += 1,
            MapOutcome::Filtered(FilterReason::IdOutOfRange) => self.filtered_id_range += 1,
            MapOutcome::Filtered(FilterReason::FlagMismatch) => self.filtered_flag += 1,
            MapOutcome::JoinMiss => self.join_misses += 1,
            MapOutcome::Malformed(_) => self.malformed += 1,
        }
    }

    pub fn record_reference_load(&mut self, report: LoadReport) {
        self.reference_rows_skipped += report.skipped;
        self.reference_ids_overwritten += report.overwritten;
    }

    /// Records read but not emitted
    pub fn dropped(&self) -> u64 {
        self.records_read - self.emitted
    }
}

impl Semigroup for DropCounters {
    fn combine(self, other: Self) -> Self {
        Self {
            records_read: self.records_read + other.records_read,
            emitted: self.emitted + other.emitted,
            malformed: self.malformed + other.malformed,
            filtered_id_range: self.filtered_id_range + other.filtered_id_range,
            filtered_flag: self.filtered_flag + other.filtered_flag,
            join_misses: self.join_misses + other.join_misses,
            reference_rows_skipped: self.reference_rows_skipped + other.reference_rows_skipped,
            reference_ids_overwritten: self.reference_ids_overwritten
                + other.reference_ids_overwritten,
        }
    }
}

impl Monoid for DropCounters {
    fn empty() -> Self {
        Self::default()
    }
}
