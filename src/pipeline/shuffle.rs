//! In-process shuffle, grouping and final reduction
//!
//! Map output is hash-partitioned by key so every pair sharing a key lands in
//! the same partition. Each partition groups its pairs, finalizes every group
//! and sorts its results; the sorted partitions are then merged under the
//! job's [`KeyOrdering`].

use super::aggregate::{AggregateKind, FinalAggregator, PartialAggregate};
use super::combiner::MapOutput;
use super::ordering::KeyOrdering;
use super::GroupResult;
use crate::error::Result;
use rayon::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use tracing::debug;

/// Choose the partition for a key
pub fn partition_for(key: &str, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions.max(1) as u64) as usize
}

type Partition = HashMap<String, Vec<PartialAggregate>>;

/// Collects map output from all workers, routed by key
#[derive(Debug)]
pub struct Shuffle {
    partitions: Vec<Partition>,
    pairs: usize,
}

impl Shuffle {
    pub fn new(partitions: usize) -> Self {
        Self {
            partitions: vec![Partition::new(); partitions.max(1)],
            pairs: 0,
        }
    }

    /// Route one worker's output
    pub fn add(&mut self, output: MapOutput) {
        let n = self.partitions.len();
        for (key, partial) in output.pairs {
            self.pairs += 1;
            self.partitions[partition_for(&key, n)]
                .entry(key)
                .or_default()
                .push(partial);
        }
    }

    /// Number of pairs that crossed the shuffle
    pub fn pairs(&self) -> usize {
        self.pairs
    }

    /// Reduce every group and merge the partitions into the final order
    pub fn reduce(self, kind: AggregateKind, ordering: &KeyOrdering) -> Result<Vec<GroupResult>> {
        let sorted = self
            .partitions
            .into_par_iter()
            .enumerate()
            .map(|(index, partition)| -> Result<Vec<GroupResult>> {
                let mut results = reduce_partition(kind, partition)?;
                ordering.sort_by_key(&mut results, |r| r.key.as_str());
                debug!(partition = index, groups = results.len(), "Reduced partition");
                Ok(results)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(merge_sorted(sorted, ordering))
    }
}

fn reduce_partition(kind: AggregateKind, partition: Partition) -> Result<Vec<GroupResult>> {
    partition
        .into_iter()
        .map(|(key, partials)| {
            let mut aggregator = FinalAggregator::new(kind);
            for partial in partials {
                aggregator.accumulate(partial);
            }
            let aggregate = aggregator
                .finalize()
                .map_err(|e| e.with_context(format!("key '{}'", key.escape_debug())))?;
            Ok(GroupResult { key, aggregate })
        })
        .collect()
}

/// Merge individually sorted runs into one sorted sequence
pub fn merge_sorted(runs: Vec<Vec<GroupResult>>, ordering: &KeyOrdering) -> Vec<GroupResult> {
    let total = runs.iter().map(Vec::len).sum();
    let mut runs: Vec<_> = runs.into_iter().map(Vec::into_iter).collect();
    let mut merged = Vec::with_capacity(total);

    loop {
        let next = runs
            .iter()
            .enumerate()
            .filter_map(|(index, run)| run.as_slice().first().map(|head| (index, head)))
            .min_by(|(_, a), (_, b)| ordering.compare(&a.key, &b.key))
            .map(|(index, _)| index);

        match next {
            Some(index) => merged.extend(runs[index].next()),
            None => break,
        }
    }

    merged
}
