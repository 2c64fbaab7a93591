//! Validated outcome histograms.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::InvalidInput;

/// Mapping from measured bitstring to the number of shots that produced it.
///
/// Construction enforces the invariants every statistic relies on:
/// keys are non-empty strings over `{0,1}` of one common width, and the
/// total count is positive. Zero-count entries are dropped, so every key
/// present is an observed outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, u64>", into = "BTreeMap<String, u64>")]
pub struct OutcomeHistogram {
    counts: BTreeMap<String, u64>,
    total: u64,
    width: usize,
}

impl OutcomeHistogram {
    /// Validate a raw count map.
    pub fn new(counts: BTreeMap<String, u64>) -> Result<Self, InvalidInput> {
        let mut width = None;
        let mut total = 0u64;

        for key in counts.keys() {
            if key.is_empty() || !key.bytes().all(|b| b == b'0' || b == b'1') {
                return Err(InvalidInput::MalformedKey { key: key.clone() });
            }
            match width {
                None => width = Some(key.len()),
                Some(expected) if expected != key.len() => {
                    return Err(InvalidInput::InconsistentWidth {
                        key: key.clone(),
                        expected,
                        found: key.len(),
                    });
                }
                Some(_) => {}
            }
        }

        let counts: BTreeMap<String, u64> = counts.into_iter().filter(|(_, c)| *c > 0).collect();
        for c in counts.values() {
            total = total.saturating_add(*c);
        }

        if total == 0 {
            return Err(InvalidInput::EmptyHistogram);
        }

        Ok(Self {
            counts,
            total,
            width: width.unwrap_or(0),
        })
    }

    /// Build from `(bitstring, count)` pairs. Repeated keys are summed.
    pub fn from_pairs<I, K>(pairs: I) -> Result<Self, InvalidInput>
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        let mut counts = BTreeMap::new();
        for (key, count) in pairs {
            let entry = counts.entry(key.into()).or_insert(0u64);
            *entry = entry.saturating_add(count);
        }
        Self::new(counts)
    }

    /// Sum of all counts (the number of shots that produced this histogram).
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of measured bits per outcome.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of distinct observed outcomes.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Always false for a constructed histogram; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Count for `key`, 0 if never observed.
    pub fn count(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Probability of `key`, 0.0 if never observed.
    pub fn probability(&self, key: &str) -> f64 {
        self.count(key) as f64 / self.total as f64
    }

    /// Iterate `(bitstring, count)` in lexicographic key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Observed bitstrings in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Normalized probability vector in lexicographic key order.
    pub fn probabilities(&self) -> Vec<f64> {
        let total = self.total as f64;
        self.counts.values().map(|&c| c as f64 / total).collect()
    }

    /// Check that the histogram accounts for exactly `shots` executions.
    pub fn check_shots(&self, shots: u64) -> Result<(), InvalidInput> {
        if self.total != shots {
            return Err(InvalidInput::ShotMismatch {
                expected: shots,
                found: self.total,
            });
        }
        Ok(())
    }

    /// Borrow the underlying count map.
    pub fn as_map(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }
}

impl TryFrom<BTreeMap<String, u64>> for OutcomeHistogram {
    type Error = InvalidInput;

    fn try_from(counts: BTreeMap<String, u64>) -> Result<Self, Self::Error> {
        Self::new(counts)
    }
}

impl From<OutcomeHistogram> for BTreeMap<String, u64> {
    fn from(h: OutcomeHistogram) -> Self {
        h.counts
    }
}
