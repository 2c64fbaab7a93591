//! Static structural metrics of a program.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::MEASURE_KIND;
use crate::program::Program;

/// Shape of a program, independent of how it executes.
///
/// The trailing measurement counts as `slot_count` operations of kind
/// `measure` and adds one layer of depth after a barrier across all slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticMetrics {
    /// Resource slots.
    pub slot_count: usize,
    /// Longest chain of operations that share a slot.
    pub depth: usize,
    /// Total operations.
    pub operation_count: usize,
    /// Operations per kind.
    pub operation_counts: BTreeMap<String, usize>,
    /// `operation_count / depth`, or `operation_count` when depth is 0.
    pub parallelism: f64,
}

impl StaticMetrics {
    /// Compute the metrics of `program`.
    pub fn of(program: &Program) -> Self {
        let slot_count = program.slot_count();

        // levels[s] = depth of the last operation that touched slot s
        let mut levels = vec![0usize; slot_count];
        for op in program.operations() {
            let level = op.slots.iter().map(|&s| levels[s]).max().unwrap_or(0) + 1;
            for &s in &op.slots {
                levels[s] = level;
            }
        }
        let mut depth = levels.iter().copied().max().unwrap_or(0);

        let mut operation_counts: BTreeMap<String, usize> = program
            .kind_counts()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let mut operation_count = program.operations().len();

        if program.is_measured() && slot_count > 0 {
            depth += 1;
            operation_count += slot_count;
            *operation_counts.entry(MEASURE_KIND.to_string()).or_insert(0) += slot_count;
        }

        let parallelism = if depth == 0 {
            operation_count as f64
        } else {
            operation_count as f64 / depth as f64
        };

        Self {
            slot_count,
            depth,
            operation_count,
            operation_counts,
            parallelism,
        }
    }

    /// Count for one kind, 0 if absent.
    pub fn count_of(&self, kind: &str) -> usize {
        self.operation_counts.get(kind).copied().unwrap_or(0)
    }
}
