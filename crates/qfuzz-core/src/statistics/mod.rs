//! Statistical functions over outcome histograms and timing samples.
//!
//! - [`outcome`]: distribution statistics (entropy, distance to uniform, fidelity)
//! - [`quantile`]: percentiles and moments of duration samples

pub mod outcome;
pub mod quantile;

pub use outcome::{
    classical_fidelity, count_variance, difference_entropy, distance_to_uniform, shannon_entropy,
};
pub use quantile::{mean, percentile_sorted, quartiles, std_dev};
