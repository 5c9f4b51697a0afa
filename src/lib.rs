//! # devstats
//!
//! Device statistics over comma-separated readings, computed as a
//! map/combine/shuffle/reduce pipeline with a map-side join against a small
//! `id,category` reference table.
//!
//! ## Usage
//!
//! ```bash
//! devstats run --preset stats-1 --reference ./preload/device.csv --input ./input --output ./output
//! devstats run --config job.yml --summary
//! devstats presets
//! ```
//!
//! ## Modules
//!
//! - `pipeline` - Filter/join, combiner, shuffle, ordering and reduction
//! - `config` - YAML job files, command-line overrides and validation
//! - `input` - Shard discovery for file and directory inputs
//! - `output` - Result formatting and atomic output
//! - `job` - End-to-end runner and run summary
//! - `error` - Unified error type with numbered codes
pub mod config;
pub mod error;
pub mod input;
pub mod job;
pub mod output;
pub mod pipeline;

pub use error::{Result, StatsError};
