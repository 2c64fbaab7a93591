//! Percentiles and moments for timing samples.
//!
//! Percentiles interpolate linearly between order statistics:
//! ```text
//! idx = (p / 100) * (n - 1)
//! q   = x[floor(idx)] * (1 - frac) + x[ceil(idx)] * frac
//! ```
//! This is the estimator most analysis toolkits use by default, so quartiles
//! computed here agree with the ones a downstream notebook would compute.

/// Percentile `p` (in `[0, 100]`) of an ascending-sorted slice.
///
/// Returns `None` for an empty slice. `p` is clamped into range.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    debug_assert!(
        sorted.windows(2).all(|w| w[0] <= w[1]),
        "percentile_sorted requires ascending input"
    );

    match sorted.len() {
        0 => None,
        1 => Some(sorted[0]),
        n => {
            let p = p.clamp(0.0, 100.0);
            let idx = (p / 100.0) * (n - 1) as f64;
            let lower = idx.floor() as usize;
            let upper = (idx.ceil() as usize).min(n - 1);
            let frac = idx - lower as f64;
            Some(sorted[lower] * (1.0 - frac) + sorted[upper] * frac)
        }
    }
}

/// First and third quartiles of an ascending-sorted slice.
pub fn quartiles(sorted: &[f64]) -> Option<(f64, f64)> {
    Some((percentile_sorted(sorted, 25.0)?, percentile_sorted(sorted, 75.0)?))
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Population standard deviation, `None` for an empty slice.
pub fn std_dev(samples: &[f64]) -> Option<f64> {
    let m = mean(samples)?;
    let var = samples.iter().map(|x| (x - m).powi(2)).sum::<f64>() / samples.len() as f64;
    Some(var.sqrt())
}
