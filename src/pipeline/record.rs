//! Map-side filtering, join and key derivation
//!
//! A [`RecordFilterJoin`] turns one raw `id,flag,value` line into at most one
//! [`IntermediateEntry`]. Which records survive and how their key is built is
//! decided by a [`JoinPolicy`].

use super::reference::ReferenceTable;
use super::IntermediateEntry;
use crate::error::RecordError;
use serde::{Deserialize, Serialize};

/// Literal flag value marking a reading without a channel
pub const NULL_FLAG: &str = "NULL";

/// Separator between key fields for composite keys
pub const KEY_SEPARATOR: char = '\t';

/// Rule applied to the flag field of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagRule {
    /// Flag must equal the literal
    Equals(String),
    /// Flag must differ from the literal
    NotEquals(String),
}

impl FlagRule {
    pub fn accepts(&self, flag: &str) -> bool {
        match self {
            Self::Equals(expected) => flag == expected,
            Self::NotEquals(rejected) => flag != rejected,
        }
    }
}

/// How the grouping key is derived from a joined record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyShape {
    /// The reference category alone
    Category,
    /// `flag<separator>category`
    FlagAndCategory { separator: char },
}

impl KeyShape {
    fn build(&self, flag: &str, category: &str) -> String {
        match self {
            Self::Category => category.to_string(),
            Self::FlagAndCategory { separator } => {
                let mut key = String::with_capacity(flag.len() + category.len() + 1);
                key.push_str(flag);
                key.push(*separator);
                key.push_str(category);
                key
            }
        }
    }
}

/// Predicate and key builder for one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPolicy {
    /// Exclusive lower bound on the device id
    pub id_above: i64,
    /// Exclusive upper bound on the device id
    pub id_below: i64,
    pub flag: FlagRule,
    pub key: KeyShape,
}

impl JoinPolicy {
    pub fn id_in_range(&self, id: i64) -> bool {
        id > self.id_above && id < self.id_below
    }
}

/// Why a well-formed record produced no entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    IdOutOfRange,
    FlagMismatch,
}

/// Classification of a single raw record
#[derive(Debug, Clone, PartialEq)]
pub enum MapOutcome {
    Emit(IntermediateEntry),
    Filtered(FilterReason),
    /// The id is absent from the reference table (inner join)
    JoinMiss,
    Malformed(RecordError),
}

/// Per-record filter, join and key derivation bound to one reference table
#[derive(Debug, Clone, Copy)]
pub struct RecordFilterJoin<'a> {
    policy: &'a JoinPolicy,
    table: &'a ReferenceTable,
}

impl<'a> RecordFilterJoin<'a> {
    pub fn new(policy: &'a JoinPolicy, table: &'a ReferenceTable) -> Self {
        Self { policy, table }
    }

    /// Process one line, returning the entry it produces if any
    ///
    /// Filtered records and join misses yield `Ok(None)`; malformed records
    /// yield the reason they were rejected.
    pub fn process(&self, line: &str) -> Result<Option<IntermediateEntry>, RecordError> {
        match self.classify(line) {
            MapOutcome::Emit(entry) => Ok(Some(entry)),
            MapOutcome::Filtered(_) | MapOutcome::JoinMiss => Ok(None),
            MapOutcome::Malformed(err) => Err(err),
        }
    }

    /// Classify one line into exactly one [`MapOutcome`]
    pub fn classify(&self, line: &str) -> MapOutcome {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let fields: Vec<&str> = line.split(',').collect();
        let [id_field, flag, value_field] = fields[..] else {
            return MapOutcome::Malformed(RecordError::FieldCount {
                found: fields.len(),
            });
        };

        let Ok(id) = id_field.parse::<i64>() else {
            return MapOutcome::Malformed(RecordError::InvalidId {
                raw: id_field.to_string(),
            });
        };

        if !self.policy.id_in_range(id) {
            return MapOutcome::Filtered(FilterReason::IdOutOfRange);
        }
        if !self.policy.flag.accepts(flag) {
            return MapOutcome::Filtered(FilterReason::FlagMismatch);
        }

        let Some(category) = self.table.category(id) else {
            return MapOutcome::JoinMiss;
        };

        match parse_value(value_field) {
            Some(value) => MapOutcome::Emit(IntermediateEntry {
                key: self.policy.key.build(flag, category),
                value,
            }),
            None => MapOutcome::Malformed(RecordError::InvalidValue {
                raw: value_field.to_string(),
            }),
        }
    }
}

/// Surrounding whitespace is ignored; the id and flag fields stay exact
fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
