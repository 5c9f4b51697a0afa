//! Join, filter and aggregate pipeline
//!
//! Data flows leaf-first through the submodules:
//!
//! - `reference` - per-worker reference table for the map-side join
//! - `record` - per-record filter, join and key derivation
//! - `combiner` - spill buffer and associative pre-aggregation
//! - `shuffle` - partitioning, grouping and final reduction
//! - `ordering` - total order over output keys
//! - `aggregate` - partial aggregates and the per-group reducer
//! - `preset` - the two named jobs
//! - `worker` / `driver` - map tasks and the end-to-end run

pub mod aggregate;
pub mod combiner;
pub mod counters;
pub mod driver;
pub mod ordering;
pub mod preset;
pub mod record;
pub mod reference;
pub mod shuffle;
pub mod worker;


pub use aggregate::{AggregateKind, FinalAggregator, PartialAggregate};
pub use counters::DropCounters;
pub use driver::{JobOutput, Pipeline};
pub use ordering::{KeyOrdering, SortOrder};
pub use preset::{JobPreset, JobSpec};
pub use record::{JoinPolicy, MapOutcome, RecordFilterJoin};
pub use reference::ReferenceTable;
pub use worker::{ReferenceSource, Shard};

use serde::{Deserialize, Serialize};

/// A keyed value emitted by the map side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediateEntry {
    pub key: String,
    pub value: f64,
}

/// Final aggregate for one distinct key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupResult {
    pub key: String,
    pub aggregate: f64,
}

/// Default number of entries a worker buffers before a combine pass
pub const DEFAULT_SPILL_THRESHOLD: usize = 10_000;

/// How a run is spread over threads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Map workers running concurrently
    pub workers: usize,
    /// Reduce partitions
    pub reducers: usize,
    /// Combine buffered entries at every spill
    pub combiner: bool,
    /// Buffered entries per spill
    pub spill_threshold: usize,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            reducers: 1,
            combiner: true,
            spill_threshold: DEFAULT_SPILL_THRESHOLD,
        }
    }
}
