//! Named job presets
//!
//! A [`JobSpec`] bundles everything that differs between jobs: the record
//! predicate and key builder, the aggregation and the output ordering. The two
//! presets reproduce the device statistics jobs.

use super::aggregate::AggregateKind;
use super::ordering::KeyOrdering;
use super::record::{FlagRule, JoinPolicy, KeyShape, KEY_SEPARATOR, NULL_FLAG};
use crate::error::{ErrorCode, StatsError};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parameters of one aggregation job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub policy: JoinPolicy,
    pub aggregate: AggregateKind,
    pub ordering: KeyOrdering,
}

/// Built-in job definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum JobPreset {
    /// Sum of untagged readings per category, categories descending
    #[serde(rename = "stats-1")]
    #[value(name = "stats-1")]
    StatsOne,
    /// Mean of tagged readings per (flag, category), flag descending then category ascending
    #[serde(rename = "stats-2")]
    #[value(name = "stats-2")]
    StatsTwo,
}

impl JobPreset {
    pub const ALL: [JobPreset; 2] = [JobPreset::StatsOne, JobPreset::StatsTwo];

    pub fn name(self) -> &'static str {
        match self {
            Self::StatsOne => "stats-1",
            Self::StatsTwo => "stats-2",
        }
    }

    /// Job name used when the job file does not set one
    pub fn default_job_name(self) -> &'static str {
        match self {
            Self::StatsOne => "device stats 1",
            Self::StatsTwo => "device stats 2",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::StatsOne => {
                "ids in (0, 1000) with flag NULL; key = category; sum; key descending"
            }
            Self::StatsTwo => {
                "ids in (0, 10) with flag other than NULL; key = flag<TAB>category; mean; \
                 flag descending, category ascending"
            }
        }
    }

    pub fn spec(self) -> JobSpec {
        match self {
            Self::StatsOne => JobSpec {
                policy: JoinPolicy {
                    id_above: 0,
                    id_below: 1000,
                    flag: FlagRule::Equals(NULL_FLAG.to_string()),
                    key: KeyShape::Category,
                },
                aggregate: AggregateKind::Sum,
                ordering: KeyOrdering::descending(),
            },
            Self::StatsTwo => JobSpec {
                policy: JoinPolicy {
                    id_above: 0,
                    id_below: 10,
                    flag: FlagRule::NotEquals(NULL_FLAG.to_string()),
                    key: KeyShape::FlagAndCategory {
                        separator: KEY_SEPARATOR,
                    },
                },
                aggregate: AggregateKind::Mean,
                ordering: KeyOrdering::descending_then_ascending(KEY_SEPARATOR),
            },
        }
    }
}

impl fmt::Display for JobPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JobPreset {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == s)
            .ok_or_else(|| {
                StatsError::config_with_code(
                    ErrorCode::CONFIG_UNKNOWN_PRESET,
                    format!("Unknown preset '{}'. Expected one of: stats-1, stats-2", s),
                )
            })
    }
}
