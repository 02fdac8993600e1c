//! Population estimates from sampled detections.
//!
//! Converts "k positive rows out of n sampled" into a point estimate and
//! 95% confidence interval for the whole population, using the Wilson
//! score interval for a binomial proportion. Wilson stays calibrated when
//! the observed proportion sits at or near 0 or 1, which is the common
//! case for sparse anomalies; the normal approximation does not.

// Statistical computation and float/int conversions
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::suboptimal_flops)]

use serde::{Deserialize, Serialize};

/// z value for a 95% two-sided interval.
const Z_95: f64 = 1.96;

/// Sample-to-population extrapolation of a per-row boolean detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepetitionEstimate {
    /// Rows sampled (n).
    pub sample_size: u64,
    /// Positive detections among the sample (k).
    pub sample_count: u64,
    /// k / n, in `[0, 1]`.
    pub sample_proportion: f64,
    /// `round(sample_proportion * total_rows)`.
    pub point_estimate_total: u64,
    /// 95% confidence interval scaled to population counts.
    pub interval_total: (u64, u64),
    /// Population size the estimate is scaled to.
    pub total_rows: u64,
}

impl RepetitionEstimate {
    /// Returns the estimated fraction of affected rows in the population.
    pub fn rate(&self) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            self.point_estimate_total as f64 / self.total_rows as f64
        }
    }
}

/// Wilson-interval estimator for sampled binomial detections.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplingEstimator;

impl SamplingEstimator {
    /// Creates the estimator.
    pub fn new() -> Self {
        Self
    }

    /// Extrapolates `k` detections among `n` sampled rows to a population
    /// of `total_rows`.
    ///
    /// `n = 0` deterministically yields estimate 0 and interval (0, 0).
    pub fn estimate(&self, k: u64, n: u64, total_rows: u64) -> RepetitionEstimate {
        let (p_hat, lower, upper) = wilson_interval(k, n);

        let total = total_rows as f64;
        RepetitionEstimate {
            sample_size: n,
            sample_count: k,
            sample_proportion: p_hat,
            point_estimate_total: (p_hat * total).round() as u64,
            interval_total: (
                (lower * total).round() as u64,
                (upper * total).round() as u64,
            ),
            total_rows,
        }
    }
}

/// Wilson 95% score interval for `k` successes in `n` trials.
///
/// Returns `(p_hat, lower, upper)` with both bounds clamped to `[0, 1]`.
/// `n = 0` yields all zeros.
pub fn wilson_interval(k: u64, n: u64) -> (f64, f64, f64) {
    if n == 0 {
        return (0.0, 0.0, 0.0);
    }
    let n = n as f64;
    let p_hat = k as f64 / n;
    let z = Z_95;

    let denom = 1.0 + z * z / n;
    let center = (p_hat + z * z / (2.0 * n)) / denom;
    let margin = z * ((p_hat * (1.0 - p_hat) + z * z / (4.0 * n)) / n).sqrt() / denom;

    let lower = (center - margin).max(0.0);
    let upper = (center + margin).min(1.0);
    (p_hat, lower, upper)
}
