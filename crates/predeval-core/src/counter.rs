//! Completeness bookkeeping: which rows each partition expects and which it received.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::arena::{Dimensions, PartitionArena};
use crate::error::{EvalError, Result};
use crate::types::{PartitionKey, SplitAssignment};

/// Row ids listed per category before the diagnostic is abbreviated.
const MAX_LISTED_IDS: usize = 20;

/// Difference between expected and observed predictions of one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDiscrepancy {
    pub key: PartitionKey,
    /// The partition lies outside the split assignment's grid.
    pub outside_grid: bool,
    pub missing: Vec<usize>,
    pub duplicate: Vec<usize>,
    pub unexpected: Vec<usize>,
}

impl fmt::Display for PartitionDiscrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;
        if self.outside_grid {
            f.write_str(" (not in split assignment)")?;
        }
        f.write_str(":")?;
        let mut sep = " ";
        for (label, ids) in [
            ("missing", &self.missing),
            ("duplicate", &self.duplicate),
            ("unexpected", &self.unexpected),
        ] {
            if ids.is_empty() {
                continue;
            }
            write!(f, "{sep}{label} row_ids {}", list_ids(ids))?;
            sep = ", ";
        }
        Ok(())
    }
}

fn list_ids(ids: &[usize]) -> String {
    let shown: Vec<String> = ids.iter().take(MAX_LISTED_IDS).map(|id| id.to_string()).collect();
    if ids.len() > MAX_LISTED_IDS {
        format!("[{}, ... ({} more)]", shown.join(", "), ids.len() - MAX_LISTED_IDS)
    } else {
        format!("[{}]", shown.join(", "))
    }
}

#[derive(Debug, Clone)]
pub struct PredictionCounter {
    expected: PartitionArena<BTreeSet<usize>>,
    observed: PartitionArena<BTreeMap<usize, usize>>,
    /// Predictions addressed to partitions outside the grid.
    foreign: BTreeMap<PartitionKey, BTreeMap<usize, usize>>,
}

impl PredictionCounter {
    pub fn new(splits: &SplitAssignment) -> Result<Self> {
        if splits.is_empty() {
            return Err(EvalError::InvalidSplits("split assignment contains no test rows".into()));
        }
        let dims = Dimensions::covering(splits.entries().iter().map(|(key, _)| key))
            .ok_or_else(|| EvalError::InvalidSplits("partition index out of range".into()))?;
        // every partition of the grid needs at least one expected row
        match dims.partitions() {
            Some(partitions) if partitions <= splits.len() => {}
            _ => {
                return Err(EvalError::InvalidSplits(format!(
                    "{} rows cannot fill a grid of {} repeats, {} folds, {} samples",
                    splits.len(),
                    dims.repeats,
                    dims.folds,
                    dims.samples
                )))
            }
        }

        let mut expected = PartitionArena::new(dims, 1, BTreeSet::new)?;
        for (key, row_id) in splits.entries() {
            let set = expected
                .get_mut(key, 0)
                .ok_or_else(|| EvalError::InvalidSplits(format!("{key} lies outside the grid")))?;
            if !set.insert(*row_id) {
                return Err(EvalError::InvalidSplits(format!(
                    "row_id {row_id} assigned twice to {key}"
                )));
            }
        }

        Ok(Self {
            expected,
            observed: PartitionArena::new(dims, 1, BTreeMap::new)?,
            foreign: BTreeMap::new(),
        })
    }

    pub fn dims(&self) -> Dimensions {
        self.expected.dims()
    }

    pub fn repeats(&self) -> usize {
        self.dims().repeats
    }

    pub fn folds(&self) -> usize {
        self.dims().folds
    }

    pub fn samples(&self) -> usize {
        self.dims().samples
    }

    /// Number of predictions the split assignment expects in total.
    pub fn expected_total(&self) -> usize {
        self.expected.iter().map(|(_, sets)| sets[0].len()).sum()
    }

    pub fn add_prediction(&mut self, repeat: usize, fold: usize, sample: usize, row_id: usize) {
        let key = PartitionKey::new(repeat, fold, sample);
        let seen = match self.observed.get_mut(&key, 0) {
            Some(seen) => seen,
            None => self.foreign.entry(key).or_default(),
        };
        *seen.entry(row_id).or_insert(0) += 1;
    }

    /// Expected row count of a partition; 0 outside the grid.
    pub fn shadow_type_size(&self, repeat: usize, fold: usize, sample: usize) -> usize {
        self.expected
            .get(&PartitionKey::new(repeat, fold, sample), 0)
            .map_or(0, BTreeSet::len)
    }

    pub fn discrepancies(&self) -> Vec<PartitionDiscrepancy> {
        let mut out = Vec::new();
        for ((key, expected), (_, observed)) in self.expected.iter().zip(self.observed.iter()) {
            let (expected, observed) = (&expected[0], &observed[0]);
            let d = PartitionDiscrepancy {
                key,
                outside_grid: false,
                missing: expected.iter().filter(|id| !observed.contains_key(*id)).copied().collect(),
                duplicate: duplicates(observed),
                unexpected: observed.keys().filter(|id| !expected.contains(*id)).copied().collect(),
            };
            if !(d.missing.is_empty() && d.duplicate.is_empty() && d.unexpected.is_empty()) {
                out.push(d);
            }
        }
        for (key, observed) in &self.foreign {
            out.push(PartitionDiscrepancy {
                key: *key,
                outside_grid: true,
                missing: Vec::new(),
                duplicate: duplicates(observed),
                unexpected: observed.keys().copied().collect(),
            });
        }
        out
    }

    /// True iff every partition received each expected row exactly once and nothing else.
    pub fn check(&self) -> bool {
        self.foreign.is_empty()
            && self
                .expected
                .iter()
                .zip(self.observed.iter())
                .all(|((_, expected), (_, observed))| {
                    let (expected, observed) = (&expected[0], &observed[0]);
                    expected.len() == observed.len()
                        && observed.iter().all(|(id, n)| *n == 1 && expected.contains(id))
                })
    }

    /// Diagnostic for a failed [`check`](Self::check); empty when the counts match.
    pub fn error_message(&self) -> String {
        self.discrepancies()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

fn duplicates(observed: &BTreeMap<usize, usize>) -> Vec<usize> {
    observed.iter().filter(|(_, n)| **n > 1).map(|(id, _)| *id).collect()
}
