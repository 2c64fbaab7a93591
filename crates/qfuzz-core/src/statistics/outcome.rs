//! Distribution statistics over outcome histograms.
//!
//! Every function normalizes counts to probabilities before comparing, so
//! histograms built from different shot totals are directly comparable.
//! Two-histogram functions align on the union of observed keys: an outcome
//! seen in only one histogram contributes probability 0 on the other side
//! instead of being dropped.

use std::collections::BTreeSet;

use crate::error::InvalidInput;
use crate::histogram::OutcomeHistogram;

/// Shannon entropy in bits, `-Σ p log2 p`.
///
/// Lies in `[0, log2(len)]`, reaching the upper bound only when every
/// observed outcome has the same count. An empty histogram cannot be
/// constructed, so this is total.
pub fn shannon_entropy(h: &OutcomeHistogram) -> f64 {
    entropy_of_weights(&h.probabilities()).unwrap_or(0.0)
}

/// First-order Wasserstein distance to the uniform distribution over the same
/// number of observed outcomes.
///
/// Both distributions are indexed by rank, not by bitstring: probabilities are
/// sorted in descending order and placed at positions `0..n`. Two histograms
/// holding the same multiset of counts therefore have the same distance
/// regardless of which bitstrings carry them.
pub fn distance_to_uniform(h: &OutcomeHistogram) -> f64 {
    let mut probs = h.probabilities();
    probs.sort_by(|a, b| b.total_cmp(a));

    let n = probs.len();
    let u = 1.0 / n as f64;

    // W1 on unit-spaced support is the L1 distance between the two CDFs.
    let mut cdf_p = 0.0;
    let mut cdf_u = 0.0;
    let mut distance = 0.0;
    for p in probs.iter().take(n.saturating_sub(1)) {
        cdf_p += p;
        cdf_u += u;
        distance += (cdf_p - cdf_u).abs();
    }
    distance
}

/// Classical (Bhattacharyya) fidelity `(Σ_k sqrt(p_k q_k))^2` over the key union.
///
/// Symmetric, in `[0, 1]`, and 1 exactly when both normalized distributions
/// agree. Fails if the histograms measure a different number of bits.
pub fn classical_fidelity(
    h1: &OutcomeHistogram,
    h2: &OutcomeHistogram,
) -> Result<f64, InvalidInput> {
    check_widths(h1, h2)?;

    let bc: f64 = union_keys(h1, h2)
        .map(|k| (h1.probability(k) * h2.probability(k)).sqrt())
        .sum();

    Ok((bc * bc).min(1.0))
}

/// Population variance of the probability vector (divisor = observed outcomes).
pub fn count_variance(h: &OutcomeHistogram) -> f64 {
    let probs = h.probabilities();
    let n = probs.len() as f64;
    let mean = probs.iter().sum::<f64>() / n;
    probs.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n
}

/// Entropy in bits of the normalized `|p_k - q_k|` vector over the key union.
///
/// Describes how the disagreement between two runs is spread over outcomes.
/// Returns `Ok(None)` when the two distributions are identical, since there
/// is no disagreement to normalize.
pub fn difference_entropy(
    h1: &OutcomeHistogram,
    h2: &OutcomeHistogram,
) -> Result<Option<f64>, InvalidInput> {
    check_widths(h1, h2)?;

    let diffs: Vec<f64> = union_keys(h1, h2)
        .map(|k| (h1.probability(k) - h2.probability(k)).abs())
        .collect();

    Ok(entropy_of_weights(&diffs))
}

fn check_widths(h1: &OutcomeHistogram, h2: &OutcomeHistogram) -> Result<(), InvalidInput> {
    if h1.width() != h2.width() {
        return Err(InvalidInput::WidthMismatch {
            left: h1.width(),
            right: h2.width(),
        });
    }
    Ok(())
}

fn union_keys<'a>(
    h1: &'a OutcomeHistogram,
    h2: &'a OutcomeHistogram,
) -> impl Iterator<Item = &'a str> {
    h1.keys().chain(h2.keys()).collect::<BTreeSet<_>>().into_iter()
}

/// Entropy of non-negative weights after normalizing them to sum to 1.
/// `None` when the weights sum to zero.
fn entropy_of_weights(weights: &[f64]) -> Option<f64> {
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return None;
    }
    let h: f64 = weights
        .iter()
        .filter(|&&w| w > 0.0)
        .map(|&w| {
            let p = w / sum;
            -p * p.log2()
        })
        .sum();
    Some(h.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist(pairs: &[(&str, u64)]) -> OutcomeHistogram {
        OutcomeHistogram::from_pairs(pairs.iter().map(|&(k, v)| (k, v))).unwrap()
    }

    #[test]
    fn test_bell_pair_entropy_and_self_fidelity() {
        let h = hist(&[("00", 512), ("11", 512)]);
        assert!((shannon_entropy(&h) - 1.0).abs() < 1e-12);
        assert!((classical_fidelity(&h, &h).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_noisy_vs_ideal_fidelity() {
        let noisy = hist(&[("00", 400), ("01", 50), ("10", 50), ("11", 500)]);
        let ideal = hist(&[("00", 512), ("11", 512)]);
        let f = classical_fidelity(&noisy, &ideal).unwrap();
        assert!(f > 0.0 && f < 1.0, "fidelity {f}");
        // (sqrt(0.4 * 0.5) + sqrt(0.5 * 0.5))^2
        let expected = (0.2f64.sqrt() + 0.5).powi(2);
        assert!((f - expected).abs() < 1e-12);
        assert_eq!(f, classical_fidelity(&ideal, &noisy).unwrap());
    }

    #[test]
    fn test_fidelity_disjoint_supports_is_zero() {
        let a = hist(&[("00", 10)]);
        let b = hist(&[("11", 10)]);
        assert_eq!(classical_fidelity(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_fidelity_different_shot_totals() {
        let a = hist(&[("0", 1), ("1", 1)]);
        let b = hist(&[("0", 512), ("1", 512)]);
        assert!((classical_fidelity(&a, &b).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let a = hist(&[("0", 1)]);
        let b = hist(&[("00", 1)]);
        assert_eq!(
            classical_fidelity(&a, &b),
            Err(InvalidInput::WidthMismatch { left: 1, right: 2 })
        );
        assert!(difference_entropy(&a, &b).is_err());
    }

    #[test]
    fn test_single_outcome() {
        let h = hist(&[("101", 1024)]);
        assert_eq!(shannon_entropy(&h), 0.0);
        assert_eq!(distance_to_uniform(&h), 0.0);
        assert_eq!(count_variance(&h), 0.0);
    }

    #[test]
    fn test_distance_to_uniform_rank_aligned() {
        let uniform = hist(&[("00", 5), ("01", 5), ("10", 5), ("11", 5)]);
        assert!(distance_to_uniform(&uniform).abs() < 1e-12);

        let skewed = hist(&[("0", 3), ("1", 1)]);
        assert!((distance_to_uniform(&skewed) - 0.25).abs() < 1e-12);

        // Same multiset of counts on different bitstrings.
        let mirrored = hist(&[("0", 1), ("1", 3)]);
        assert_eq!(distance_to_uniform(&skewed), distance_to_uniform(&mirrored));

        let three = hist(&[("00", 5), ("01", 3), ("10", 2)]);
        assert!((distance_to_uniform(&three) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_count_variance() {
        let h = hist(&[("0", 3), ("1", 1)]);
        // probabilities 0.75, 0.25 around mean 0.5
        assert!((count_variance(&h) - 0.0625).abs() < 1e-12);
    }

    #[test]
    fn test_difference_entropy() {
        let a = hist(&[("00", 512), ("11", 512)]);
        assert_eq!(difference_entropy(&a, &a).unwrap(), None);

        // |p - q| = (0.1, 0.05, 0.05, 0.0) normalized to (0.5, 0.25, 0.25)
        let b = hist(&[("00", 400), ("01", 50), ("10", 50), ("11", 500)]);
        let e = difference_entropy(&a, &b).unwrap().unwrap();
        assert!((e - 1.5).abs() < 1e-9, "entropy {e}");
    }
}
