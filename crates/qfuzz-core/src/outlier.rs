//! Outlier filtering for duration samples.
//!
//! Two policies are supported:
//!
//! - **IQR**: keep samples inside `[Q1 - fence·IQR, Q3 + fence·IQR]`, with
//!   quartiles interpolated linearly (see [`crate::statistics::quantile`]).
//! - **Relative bound**: drop samples strictly greater than `k·r`, where `r`
//!   is either the unfiltered sample mean or a caller-supplied value.
//!
//! Filtering preserves input order. An empty result is a valid outcome (for
//! example every sample exceeding a fixed reference); only an empty input is
//! rejected.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_IQR_FENCE, DEFAULT_RELATIVE_MULTIPLIER};
use crate::error::InvalidInput;
use crate::statistics::quantile::{mean, quartiles, std_dev};

/// Reference value `r` for the relative-bound policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceValue {
    /// Mean of the unfiltered samples.
    SampleMean,
    /// Externally supplied reference.
    Fixed(f64),
}

/// How to decide which duration samples are outliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutlierPolicy {
    /// Tukey fences around the interquartile range.
    Iqr {
        /// Fence multiplier (1.5 for the classic rule).
        fence: f64,
    },
    /// Upper bound proportional to a reference value.
    RelativeBound {
        /// Multiplier `k`.
        multiplier: f64,
        /// Reference `r`.
        reference: ReferenceValue,
    },
}

impl Default for OutlierPolicy {
    fn default() -> Self {
        Self::iqr()
    }
}

impl OutlierPolicy {
    /// Classic 1.5·IQR fences.
    pub fn iqr() -> Self {
        Self::Iqr {
            fence: DEFAULT_IQR_FENCE,
        }
    }

    /// Drop samples above `multiplier` times the unfiltered mean.
    pub fn relative(multiplier: f64) -> Self {
        Self::RelativeBound {
            multiplier,
            reference: ReferenceValue::SampleMean,
        }
    }

    /// Drop samples above `multiplier · reference`.
    pub fn relative_to(multiplier: f64, reference: f64) -> Self {
        Self::RelativeBound {
            multiplier,
            reference: ReferenceValue::Fixed(reference),
        }
    }

    /// Relative bound with the default multiplier of 2 against the sample mean.
    pub fn relative_default() -> Self {
        Self::relative(DEFAULT_RELATIVE_MULTIPLIER)
    }

    /// Check the policy parameters.
    pub fn validate(&self) -> Result<(), InvalidInput> {
        match *self {
            Self::Iqr { fence } => {
                if !fence.is_finite() || fence < 0.0 {
                    return Err(InvalidInput::InvalidPolicy(format!(
                        "IQR fence must be finite and non-negative, got {fence}"
                    )));
                }
            }
            Self::RelativeBound {
                multiplier,
                reference,
            } => {
                if !multiplier.is_finite() || multiplier <= 0.0 {
                    return Err(InvalidInput::InvalidPolicy(format!(
                        "relative multiplier must be finite and positive, got {multiplier}"
                    )));
                }
                if let ReferenceValue::Fixed(r) = reference {
                    if !r.is_finite() {
                        return Err(InvalidInput::InvalidPolicy(format!(
                            "relative reference must be finite, got {r}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for OutlierPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Iqr { fence } => write!(f, "iqr:{fence}"),
            Self::RelativeBound {
                multiplier,
                reference: ReferenceValue::SampleMean,
            } => write!(f, "relative:{multiplier}"),
            Self::RelativeBound {
                multiplier,
                reference: ReferenceValue::Fixed(r),
            } => write!(f, "relative:{multiplier}@{r}"),
        }
    }
}

/// Bounds a filter pass applied and how many samples it dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierStats {
    /// Lower bound, if the policy has one.
    pub lower: Option<f64>,
    /// Upper bound.
    pub upper: f64,
    /// Number of samples removed.
    pub removed: usize,
}

/// Remove outliers from `samples` according to `policy`, preserving order.
pub fn filter_outliers(samples: &[f64], policy: &OutlierPolicy) -> Result<Vec<f64>, InvalidInput> {
    filter_outliers_with_stats(samples, policy).map(|(kept, _)| kept)
}

/// Like [`filter_outliers`], also returning the bounds that were applied.
pub fn filter_outliers_with_stats(
    samples: &[f64],
    policy: &OutlierPolicy,
) -> Result<(Vec<f64>, OutlierStats), InvalidInput> {
    if samples.is_empty() {
        return Err(InvalidInput::EmptySamples);
    }
    if let Some((index, &value)) = samples.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(InvalidInput::NonFiniteSample { index, value });
    }
    policy.validate()?;

    let (lower, upper) = match *policy {
        OutlierPolicy::Iqr { fence } => {
            let mut sorted = samples.to_vec();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let (q1, q3) = quartiles(&sorted).ok_or(InvalidInput::EmptySamples)?;
            let iqr = q3 - q1;
            (Some(q1 - fence * iqr), q3 + fence * iqr)
        }
        OutlierPolicy::RelativeBound {
            multiplier,
            reference,
        } => {
            let r = match reference {
                ReferenceValue::SampleMean => mean(samples).ok_or(InvalidInput::EmptySamples)?,
                ReferenceValue::Fixed(r) => r,
            };
            (None, multiplier * r)
        }
    };

    let kept: Vec<f64> = samples
        .iter()
        .copied()
        .filter(|&x| x <= upper && lower.map_or(true, |lo| x >= lo))
        .collect();

    let stats = OutlierStats {
        lower,
        upper,
        removed: samples.len() - kept.len(),
    };
    Ok((kept, stats))
}

/// Aggregate of one timing series after outlier filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    /// Samples before filtering.
    pub raw_count: usize,
    /// Samples that survived filtering.
    pub retained_count: usize,
    /// Mean of retained samples, `None` if none survived.
    pub mean: Option<f64>,
    /// Population standard deviation of retained samples.
    pub std_dev: Option<f64>,
}

impl TimingSummary {
    /// Filter `samples` with `policy` and summarize what is left.
    pub fn from_samples(samples: &[f64], policy: &OutlierPolicy) -> Result<Self, InvalidInput> {
        let kept = filter_outliers(samples, policy)?;
        Ok(Self {
            raw_count: samples.len(),
            retained_count: kept.len(),
            mean: mean(&kept),
            std_dev: std_dev(&kept),
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn samples_strategy() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0.001f64..1e6, 1..200)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Kept samples are an order-preserving subsequence inside the bounds.
        #[test]
        fn prop_iqr_kept_within_bounds(samples in samples_strategy()) {
            let (kept, stats) =
                filter_outliers_with_stats(&samples, &OutlierPolicy::iqr()).unwrap();
            prop_assert_eq!(kept.len() + stats.removed, samples.len());
            prop_assert!(!kept.is_empty());

            let mut it = samples.iter();
            for k in &kept {
                prop_assert!(it.any(|s| s == k), "kept sample out of order");
                prop_assert!(*k <= stats.upper);
                prop_assert!(stats.lower.map_or(true, |lo| *k >= lo));
            }
        }

        #[test]
        fn prop_relative_keeps_minimum(samples in samples_strategy()) {
            let kept = filter_outliers(&samples, &OutlierPolicy::relative_default()).unwrap();
            let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
            prop_assert!(kept.contains(&min));
        }
    }
}
