//! Partial aggregates and the final per-group reduction
//!
//! [`PartialAggregate`] is the value that travels between the map side, the
//! combiner and the reducers. Its `combine` operation is associative, so the
//! combiner may run any number of times without changing the result. A mean is
//! carried as `(sum, count)` and only divided once, in
//! [`FinalAggregator::finalize`].

use crate::error::{ErrorCode, Result, StatsError};
use serde::{Deserialize, Serialize};
use stillwater::Semigroup;

/// Aggregation function applied per group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Sum,
    Mean,
}

impl AggregateKind {
    /// Lift a single value into the partial representation for this kind
    pub fn seed(self, value: f64) -> PartialAggregate {
        match self {
            Self::Sum => PartialAggregate::sum(value),
            Self::Mean => PartialAggregate::mean(value, 1),
        }
    }
}

/// Floating-point total with a Neumaier compensation term
///
/// The compensation collects the low-order bits lost by each addition, so the
/// resolved total barely depends on how the additions were grouped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompensatedSum {
    pub sum: f64,
    pub compensation: f64,
}

impl CompensatedSum {
    pub fn new(value: f64) -> Self {
        Self {
            sum: value,
            compensation: 0.0,
        }
    }

    /// Total including the accumulated rounding error
    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

impl Semigroup for CompensatedSum {
    fn combine(self, other: Self) -> Self {
        let sum = self.sum + other.sum;
        let lost = if self.sum.abs() >= other.sum.abs() {
            (self.sum - sum) + other.sum
        } else {
            (other.sum - sum) + self.sum
        };
        Self {
            sum,
            compensation: self.compensation + other.compensation + lost,
        }
    }
}

/// Mergeable intermediate state of an aggregation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialAggregate {
    /// Running total
    Sum(CompensatedSum),
    /// Running total and number of contributing values
    Mean { sum: CompensatedSum, count: u64 },
}

impl Semigroup for PartialAggregate {
    fn combine(self, other: Self) -> Self {
        use PartialAggregate::*;

        match (self, other) {
            (Sum(a), Sum(b)) => Sum(a.combine(b)),
            (
                Mean {
                    sum: sum_a,
                    count: count_a,
                },
                Mean {
                    sum: sum_b,
                    count: count_b,
                },
            ) => Mean {
                sum: sum_a.combine(sum_b),
                count: count_a.saturating_add(count_b),
            },
            // Every partial in a run is seeded from the same AggregateKind
            (a, b) => panic!(
                "Cannot combine incompatible partial aggregates: {} and {}",
                a.kind_name(),
                b.kind_name()
            ),
        }
    }
}

impl PartialAggregate {
    pub fn sum(total: f64) -> Self {
        Self::Sum(CompensatedSum::new(total))
    }

    pub fn mean(total: f64, count: u64) -> Self {
        Self::Mean {
            sum: CompensatedSum::new(total),
            count,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Sum(_) => "Sum",
            Self::Mean { .. } => "Mean",
        }
    }
}

/// Per-group reduction: `init -> accumulate* -> finalize`
#[derive(Debug, Clone)]
pub struct FinalAggregator {
    kind: AggregateKind,
    state: Option<PartialAggregate>,
}

impl FinalAggregator {
    pub fn new(kind: AggregateKind) -> Self {
        Self { kind, state: None }
    }

    /// Fold one partial (raw value or combiner output) into the group
    pub fn accumulate(&mut self, partial: PartialAggregate) {
        self.state = Some(match self.state.take() {
            Some(state) => state.combine(partial),
            None => partial,
        });
    }

    /// Fold a raw value into the group
    pub fn accumulate_value(&mut self, value: f64) {
        self.accumulate(self.kind.seed(value));
    }

    /// Produce the group's final value
    ///
    /// A group only exists because at least one entry reached it, so an empty
    /// group means the grouping stage is broken.
    pub fn finalize(self) -> Result<f64> {
        match self.state {
            Some(PartialAggregate::Sum(total)) => Ok(total.value()),
            Some(PartialAggregate::Mean { sum, count }) if count > 0 => {
                Ok(sum.value() / count as f64)
            }
            Some(PartialAggregate::Mean { .. }) | None => Err(StatsError::internal_with_code(
                ErrorCode::INTERNAL_EMPTY_GROUP,
                "group finalized without any contributing values",
            )),
        }
    }
}
