//! Log-scale histogram binning for numeric columns.
//!
//! Token-count and similar length distributions span several orders of
//! magnitude, so bins are spaced on a log-2 grid between the column min
//! and max. Each bin carries its geometric-mean center `√(left · right)`,
//! the correct midpoint on a logarithmic axis. The rightmost interval is
//! open-ended; it gets a synthetic finite width equal to its left
//! neighbor's so it renders comparably instead of spanning to infinity.

// Bin arithmetic mixes counts and float edges
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use serde::{Deserialize, Serialize};

use crate::{
    config::{DEFAULT_HISTOGRAM_BINS, DEFAULT_TICK_COUNT},
    error::{Error, Result},
};

/// One histogram bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Left edge (inclusive for the first bin, exclusive otherwise).
    pub left: f64,
    /// Right edge (synthetic for the open rightmost bin).
    pub right: f64,
    /// `right - left`.
    pub width: f64,
    /// Geometric mean of the edges, the plotting x-position.
    pub center: f64,
    /// Values assigned to this bin.
    pub count: u64,
}

/// Binned distribution of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSpec {
    /// Chart title.
    pub title: String,
    /// Bins with strictly increasing edges.
    pub bins: Vec<HistogramBin>,
    /// Rounded, deduplicated, sorted axis tick values.
    pub ticks: Vec<u64>,
}

impl HistogramSpec {
    /// Total values across all bins.
    pub fn total_count(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }
}

/// Computes log-spaced histogram specs.
#[derive(Debug, Clone, Copy)]
pub struct HistogramBinner {
    bins: usize,
    ticks: usize,
}

impl Default for HistogramBinner {
    fn default() -> Self {
        Self::new()
    }
}

impl HistogramBinner {
    /// Creates a binner with the default bin and tick counts.
    pub fn new() -> Self {
        Self {
            bins: DEFAULT_HISTOGRAM_BINS,
            ticks: DEFAULT_TICK_COUNT,
        }
    }

    /// Sets the bin count (minimum 2).
    #[must_use]
    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins.max(2);
        self
    }

    /// Sets the tick count (minimum 2).
    #[must_use]
    pub fn with_ticks(mut self, ticks: usize) -> Self {
        self.ticks = ticks.max(2);
        self
    }

    /// Bins the given values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if there are no finite values or the
    /// minimum is not strictly positive; a log axis cannot represent
    /// zero or negative values.
    pub fn bin(&self, title: impl Into<String>, values: &[f64]) -> Result<HistogramSpec> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let Some((&min, &max)) = min_max(&finite) else {
            return Err(Error::invalid_operation(
                "column has no values for a histogram",
            ));
        };
        if min <= 0.0 {
            return Err(Error::invalid_operation(format!(
                "histogram needs strictly positive values (min is {min})"
            )));
        }

        let edges = log2_spaced(min, max, self.bins);
        let mut counts = vec![0u64; edges.len()];
        for &value in &finite {
            counts[assign_bin(&edges, value)] += 1;
        }

        let mut bins = Vec::with_capacity(edges.len());
        for (i, window) in edges.windows(2).enumerate() {
            let (left, right) = (window[0], window[1]);
            bins.push(HistogramBin {
                left,
                right,
                width: right - left,
                center: (left * right).sqrt(),
                count: counts[i],
            });
        }
        // The open rightmost interval borrows its neighbor's width so it
        // renders with a finite bar.
        let last_edge = edges[edges.len() - 1];
        let borrowed = bins.last().map_or(last_edge, |b| b.width);
        let right = last_edge + borrowed;
        bins.push(HistogramBin {
            left: last_edge,
            right,
            width: borrowed,
            center: (last_edge * right).sqrt(),
            count: counts[edges.len() - 1],
        });

        Ok(HistogramSpec {
            title: title.into(),
            bins,
            ticks: self.tick_values(min, max),
        })
    }

    /// Picks ~`ticks` log-spaced candidates across `[min, max]` and rounds
    /// each to a human scale: nearest integer below 100, nearest 10 below
    /// 1000, nearest 100 above.
    fn tick_values(&self, min: f64, max: f64) -> Vec<u64> {
        let mut ticks: Vec<u64> = log2_spaced(min, max, self.ticks)
            .into_iter()
            .map(round_to_human)
            .collect();
        ticks.sort_unstable();
        ticks.dedup();
        ticks
    }
}

fn min_max(values: &[f64]) -> Option<(&f64, &f64)> {
    let min = values
        .iter()
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))?;
    let max = values
        .iter()
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))?;
    Some((min, max))
}

/// `n` log-2-spaced points from `min` to `max` inclusive. Degenerates to
/// a doubled range when min equals max so edges stay strictly increasing.
fn log2_spaced(min: f64, max: f64, n: usize) -> Vec<f64> {
    let n = n.max(2);
    if (max - min).abs() < f64::EPSILON {
        return vec![min, min * 2.0];
    }
    let log_min = min.log2();
    let log_max = max.log2();
    let step = (log_max - log_min) / (n - 1) as f64;
    (0..n)
        .map(|i| {
            if i == n - 1 {
                max
            } else {
                (log_min + step * i as f64).exp2()
            }
        })
        .collect()
}

/// Index of the interval a value belongs to. The first interval is closed
/// on the left so the minimum lands in bin 0; values beyond the last edge
/// go to the open rightmost bin.
fn assign_bin(edges: &[f64], value: f64) -> usize {
    let bounded = edges.len() - 1;
    for i in 0..bounded {
        if value <= edges[i + 1] {
            return i;
        }
    }
    bounded
}

fn round_to_human(tick: f64) -> u64 {
    if tick < 100.0 {
        tick.round().max(0.0) as u64
    } else if tick < 1000.0 {
        ((tick / 10.0).round() * 10.0) as u64
    } else {
        ((tick / 100.0).round() * 100.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_values_ten_bins() {
        let values: Vec<f64> = (1..=1000).map(|v| v as f64).collect();
        let spec = HistogramBinner::new()
            .with_bins(10)
            .bin("token_count", &values)
            .unwrap();

        assert_eq!(spec.bins.len(), 10);
        assert_eq!(spec.total_count(), 1000);

        // Edges strictly increasing, log-2 spaced between 1 and 1000.
        assert!((spec.bins[0].left - 1.0).abs() < 1e-9);
        for pair in spec.bins.windows(2) {
            assert!(pair[0].right <= pair[1].left + 1e-9);
            assert!(pair[0].left < pair[0].right);
        }
        // Bounded edges end at the column max.
        assert!((spec.bins[8].right - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_counts_sum_to_input_size() {
        let values: Vec<f64> = (1..=777).map(|v| (v % 97 + 1) as f64).collect();
        let spec = HistogramBinner::new().bin("x", &values).unwrap();
        assert_eq!(spec.total_count(), 777);
    }

    #[test]
    fn test_open_bin_borrows_neighbor_width() {
        let values: Vec<f64> = (1..=500).map(|v| v as f64).collect();
        let spec = HistogramBinner::new().with_bins(8).bin("x", &values).unwrap();
        let open = spec.bins.last().unwrap();
        let neighbor = &spec.bins[spec.bins.len() - 2];
        assert!((open.width - neighbor.width).abs() < 1e-9);
        assert!(open.width.is_finite());
        assert!((open.right - (open.left + neighbor.width)).abs() < 1e-9);
    }

    #[test]
    fn test_geometric_centers() {
        let values: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        let spec = HistogramBinner::new().with_bins(5).bin("x", &values).unwrap();
        for bin in &spec.bins {
            assert!((bin.center - (bin.left * bin.right).sqrt()).abs() < 1e-9);
            assert!(bin.center > bin.left && bin.center < bin.right);
        }
    }

    #[test]
    fn test_min_value_lands_in_first_bin() {
        let values = vec![1.0, 1.0, 1.0, 8.0];
        let spec = HistogramBinner::new().with_bins(4).bin("x", &values).unwrap();
        assert_eq!(spec.bins[0].count, 3);
        assert_eq!(spec.total_count(), 4);
    }

    #[test]
    fn test_empty_column_fails() {
        let err = HistogramBinner::new().bin("x", &[]).err().unwrap();
        assert!(matches!(err, Error::InvalidOperation { .. }));
    }

    #[test]
    fn test_non_positive_minimum_fails() {
        let err = HistogramBinner::new().bin("x", &[0.0, 5.0]).err().unwrap();
        assert!(matches!(err, Error::InvalidOperation { .. }));
        let err = HistogramBinner::new().bin("x", &[-3.0, 5.0]).err().unwrap();
        assert!(matches!(err, Error::InvalidOperation { .. }));
    }

    #[test]
    fn test_constant_column_still_bins() {
        let values = vec![7.0; 20];
        let spec = HistogramBinner::new().bin("x", &values).unwrap();
        assert_eq!(spec.total_count(), 20);
        for pair in spec.bins.windows(2) {
            assert!(pair[0].left < pair[0].right);
            assert!(pair[1].left < pair[1].right);
        }
    }

    #[test]
    fn test_ticks_rounded_and_sorted() {
        let values: Vec<f64> = (1..=100_000).step_by(13).map(|v| v as f64).collect();
        let spec = HistogramBinner::new().with_ticks(6).bin("x", &values).unwrap();
        assert!(!spec.ticks.is_empty());
        for pair in spec.ticks.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        for &tick in &spec.ticks {
            if tick >= 1000 {
                assert_eq!(tick % 100, 0, "tick {tick} not rounded to 100s");
            } else if tick >= 100 {
                assert_eq!(tick % 10, 0, "tick {tick} not rounded to 10s");
            }
        }
    }

    #[test]
    fn test_round_to_human_tiers() {
        assert_eq!(round_to_human(7.4), 7);
        assert_eq!(round_to_human(99.6), 100);
        assert_eq!(round_to_human(234.0), 230);
        assert_eq!(round_to_human(1_549.0), 1_500);
        assert_eq!(round_to_human(12_345.0), 12_300);
    }

    #[test]
    fn test_non_finite_values_ignored() {
        let values = vec![1.0, 2.0, f64::NAN, f64::INFINITY, 4.0];
        let spec = HistogramBinner::new().with_bins(3).bin("x", &values).unwrap();
        assert_eq!(spec.total_count(), 3);
    }
}
