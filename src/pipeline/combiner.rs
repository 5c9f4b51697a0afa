//! Local pre-aggregation (combiner)
//!
//! Workers buffer their intermediate entries and periodically collapse the
//! buffer into one partial per key. Because [`PartialAggregate::combine`] is
//! associative, collapsing zero, one or many times produces the same final
//! answer; the combiner only changes how many pairs cross the shuffle.

use super::aggregate::{AggregateKind, PartialAggregate};
use super::IntermediateEntry;
use rayon::prelude::*;
use std::collections::HashMap;
use stillwater::Semigroup;

/// Per-key partials produced by a combine pass
pub type CombinedPartials = HashMap<String, PartialAggregate>;

/// Merge raw entries into one partial per key
pub fn combine<I>(kind: AggregateKind, entries: I) -> CombinedPartials
where
    I: IntoIterator<Item = IntermediateEntry>,
{
    combine_partials(
        entries
            .into_iter()
            .map(|entry| (entry.key, kind.seed(entry.value))),
    )
}

/// Merge already-seeded partials into one partial per key
///
/// Feeding the output of a previous pass back in is allowed; this is what
/// makes repeated combiner application safe.
pub fn combine_partials<I>(pairs: I) -> CombinedPartials
where
    I: IntoIterator<Item = (String, PartialAggregate)>,
{
    let mut combined = CombinedPartials::new();
    for (key, partial) in pairs {
        match combined.get_mut(&key) {
            Some(existing) => *existing = existing.combine(partial),
            None => {
                combined.insert(key, partial);
            }
        }
    }
    combined
}

/// Merge the combined outputs of many workers in parallel
///
/// Relies on the `HashMap` semigroup, which combines values of shared keys.
pub fn merge_parallel(maps: Vec<CombinedPartials>) -> CombinedPartials {
    maps.into_par_iter()
        .reduce_with(|a, b| a.combine(b))
        .unwrap_or_default()
}

/// Worker-side buffer of map output with optional spill-time combining
#[derive(Debug)]
pub struct SpillBuffer {
    kind: AggregateKind,
    combine_on_spill: bool,
    threshold: usize,
    buffer: Vec<IntermediateEntry>,
    spilled: Vec<(String, PartialAggregate)>,
    spills: usize,
}

impl SpillBuffer {
    pub fn new(kind: AggregateKind, combine_on_spill: bool, threshold: usize) -> Self {
        Self {
            kind,
            combine_on_spill,
            threshold: threshold.max(1),
            buffer: Vec::new(),
            spilled: Vec::new(),
            spills: 0,
        }
    }

    pub fn push(&mut self, entry: IntermediateEntry) {
        self.buffer.push(entry);
        if self.buffer.len() >= self.threshold {
            self.spill();
        }
    }

    fn spill(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        self.spills += 1;
        let kind = self.kind;
        let drained = self.buffer.drain(..);
        if self.combine_on_spill {
            self.spilled.extend(combine(kind, drained));
        } else {
            self.spilled
                .extend(drained.map(|entry| (entry.key, kind.seed(entry.value))));
        }
    }

    /// Flush the remaining buffer and hand back everything this worker emits
    ///
    /// With combining enabled a key may still appear once per spill; a final
    /// merge pass leaves one pair per key.
    pub fn finish(mut self) -> MapOutput {
        self.spill();
        let pairs = if self.combine_on_spill && self.spills > 1 {
            combine_partials(self.spilled).into_iter().collect()
        } else {
            self.spilled
        };
        MapOutput {
            pairs,
            spills: self.spills,
        }
    }
}

/// Everything one worker sends to the shuffle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapOutput {
    pub pairs: Vec<(String, PartialAggregate)>,
    pub spills: usize,
}
