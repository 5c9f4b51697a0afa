//! Pipeline driver
//!
//! Runs every shard on its own worker, feeds the workers' output through the
//! shuffle and returns the ordered results with the merged counters.

use super::counters::DropCounters;
use super::preset::JobSpec;
use super::shuffle::Shuffle;
use super::worker::{ReferenceSource, Shard, Worker, WorkerOutput};
use super::{ExecutionSettings, GroupResult};
use crate::error::{ErrorCode, Result, StatsError};
use rayon::prelude::*;
use stillwater::{Monoid, Semigroup};
use tracing::{debug, info, warn};

/// Ordered results of a run plus its accounting
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutput {
    pub results: Vec<GroupResult>,
    pub counters: DropCounters,
    /// Pairs that crossed the shuffle after combining
    pub shuffled_pairs: usize,
}

/// One job, ready to run over any set of shards
#[derive(Debug, Clone)]
pub struct Pipeline {
    spec: JobSpec,
    settings: ExecutionSettings,
}

impl Pipeline {
    pub fn new(spec: JobSpec, settings: ExecutionSettings) -> Self {
        Self { spec, settings }
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Run the job to completion
    ///
    /// Either every shard is processed and reduced, or the first fatal error
    /// is returned and nothing is produced.
    pub fn run(&self, reference: &ReferenceSource, shards: Vec<Shard>) -> Result<JobOutput> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.workers)
            .thread_name(|index| format!("devstats-worker-{}", index))
            .build()
            .map_err(|e| {
                StatsError::internal_with_code(
                    ErrorCode::INTERNAL_WORKER_POOL,
                    "Failed to create worker pool",
                )
                .with_source(e)
            })?;

        info!(
            shards = shards.len(),
            workers = self.settings.workers,
            reducers = self.settings.reducers,
            combiner = self.settings.combiner,
            "Starting map phase"
        );

        let outputs = pool.install(|| {
            shards
                .par_iter()
                .enumerate()
                .map(|(id, shard)| {
                    Worker::start(id, &self.spec, &self.settings, reference)?.run(shard)
                })
                .collect::<Result<Vec<WorkerOutput>>>()
        })?;

        let mut counters = DropCounters::empty();
        let mut shuffle = Shuffle::new(self.settings.reducers);
        for output in outputs {
            counters = counters.combine(output.counters);
            shuffle.add(output.map);
        }
        let shuffled_pairs = shuffle.pairs();
        debug!(pairs = shuffled_pairs, "Shuffle complete");

        let results = pool.install(|| shuffle.reduce(self.spec.aggregate, &self.spec.ordering))?;

        if counters.malformed > 0 {
            warn!(
                malformed = counters.malformed,
                "Dropped malformed records during the map phase"
            );
        }
        info!(
            groups = results.len(),
            read = counters.records_read,
            emitted = counters.emitted,
            dropped = counters.dropped(),
            "Job finished"
        );

        Ok(JobOutput {
            results,
            counters,
            shuffled_pairs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::preset::JobPreset;
    use crate::pipeline::reference::ReferenceTable;

    fn lines(raw: &[&str]) -> Shard {
        Shard::Lines(raw.iter().map(|s| s.to_string()).collect())
    }

    fn result(key: &str, aggregate: f64) -> GroupResult {
        GroupResult {
            key: key.to_string(),
            aggregate,
        }
    }

    #[test]
    fn test_stats_one_scenario() {
        let reference = ReferenceSource::Table(ReferenceTable::from_rows([(1, "A"), (2, "B")]));
        let pipeline = Pipeline::new(JobPreset::StatsOne.spec(), ExecutionSettings::default());

        let output = pipeline
            .run(
                &reference,
                vec![lines(&["1,NULL,10.0", "2,NULL,5.0", "1,NULL,20.0", "3,NULL,1.0"])],
            )
            .unwrap();

        assert_eq!(output.results, vec![result("B", 5.0), result("A", 30.0)]);
        assert_eq!(output.counters.join_misses, 1);
    }

    #[test]
    fn test_stats_two_scenario_across_shards() {
        let reference = ReferenceSource::Table(ReferenceTable::from_rows([(1, "A")]));
        let pipeline = Pipeline::new(JobPreset::StatsTwo.spec(), ExecutionSettings::default());

        let output = pipeline
            .run(
                &reference,
                vec![lines(&["1,X,10.0"]), lines(&["1,X,30.0", "1,Y,4.0"])],
            )
            .unwrap();

        assert_eq!(
            output.results,
            vec![result("Y\tA", 4.0), result("X\tA", 20.0)]
        );
    }

    #[test]
    fn test_no_shards_produces_empty_output() {
        let reference = ReferenceSource::Table(ReferenceTable::default());
        let pipeline = Pipeline::new(JobPreset::StatsOne.spec(), ExecutionSettings::default());

        let output = pipeline.run(&reference, vec![]).unwrap();
        assert!(output.results.is_empty());
        assert_eq!(output.counters, DropCounters::default());
    }

    #[test]
    fn test_missing_reference_aborts_run() {
        let reference = ReferenceSource::File("/nonexistent/device.csv".into());
        let pipeline = Pipeline::new(JobPreset::StatsOne.spec(), ExecutionSettings::default());

        let err = pipeline
            .run(&reference, vec![lines(&["1,NULL,1.0"])])
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::STORAGE_REFERENCE_UNREADABLE);
    }
}
