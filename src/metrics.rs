//! # Latency Distribution
//!
//! Mergeable summaries of per-operation completion latencies. Every target keeps
//! one distribution per direction (read/write); the report layer merges them into
//! temporary read, write and read+write views.
//!
//! Samples are bucketed into an HDR histogram (three significant figures) for
//! percentiles. Next to it sits an exact count per distinct nanosecond value, so
//! fixed-range counts compare real latencies against user boundaries instead of
//! histogram range edges. The descriptive statistics come from running moments,
//! so average and standard deviation are exact rather than range-quantized.

use crate::error::{ReportError, Result};
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Significant decimal digits preserved by the histogram ranges.
const SIGNIFICANT_FIGURES: u8 = 3;

/// Latencies are reported in microseconds and stored in the histogram as nanoseconds.
const NANOS_PER_MICRO: f64 = 1_000.0;

/// Running first and second moments plus extremes of a sample set.
///
/// Uses Welford's update for single samples and Chan's pairwise formula for
/// merges, which stays stable for very long runs where a naive sum of squares
/// would lose precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Moments {
    /// Add one sample.
    pub fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }

        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Fold another sample set into this one.
    pub fn combine(&mut self, other: &Moments) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }

        let left = self.count as f64;
        let right = other.count as f64;
        let total = left + right;
        let delta = other.mean - self.mean;

        self.mean += delta * right / total;
        self.m2 += other.m2 + delta * delta * left * right / total;
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Smallest sample, or 0 when empty.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest sample, or 0 when empty.
    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance; 0 for fewer than two samples.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / self.count as f64).max(0.0)
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Frequency distribution of latency samples, in microseconds.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "DistributionSnapshot", into = "DistributionSnapshot")]
pub struct LatencyDistribution {
    histogram: Histogram<u64>,
    /// Sample count per recorded latency, in nanoseconds.
    hits: BTreeMap<u64, u64>,
    moments: Moments,
}

impl LatencyDistribution {
    /// Create an empty distribution.
    pub fn new() -> Result<Self> {
        Ok(Self {
            histogram: Histogram::<u64>::new(SIGNIFICANT_FIGURES)?,
            hits: BTreeMap::new(),
            moments: Moments::default(),
        })
    }

    /// Record a single completion latency.
    pub fn record(&mut self, latency_us: f64) -> Result<()> {
        let latency_us = latency_us.max(0.0);
        let value_ns = to_nanos(latency_us);
        self.histogram.record(value_ns)?;
        *self.hits.entry(value_ns).or_insert(0) += 1;
        self.moments.push(latency_us);
        Ok(())
    }

    /// Fold `other` into this distribution.
    ///
    /// The result is indistinguishable from having recorded both sample sets
    /// into a single distribution. Merging an empty distribution is a no-op.
    pub fn merge(&mut self, other: &LatencyDistribution) -> Result<()> {
        if other.is_empty() {
            return Ok(());
        }
        self.histogram.add(&other.histogram)?;
        for (&value_ns, &count) in &other.hits {
            *self.hits.entry(value_ns).or_insert(0) += count;
        }
        self.moments.combine(&other.moments);
        Ok(())
    }

    pub fn sample_count(&self) -> u64 {
        self.moments.count()
    }

    pub fn is_empty(&self) -> bool {
        self.moments.is_empty()
    }

    /// Number of distinct latency ranges that received at least one sample.
    pub fn bin_count(&self) -> usize {
        self.histogram.iter_recorded().count()
    }

    pub fn min(&self) -> f64 {
        self.moments.min()
    }

    pub fn max(&self) -> f64 {
        self.moments.max()
    }

    pub fn average(&self) -> f64 {
        self.moments.mean()
    }

    pub fn std_dev(&self) -> f64 {
        self.moments.std_dev()
    }

    /// Latency at rank `ceil(p * N)` for `p` in `(0, 1)`.
    ///
    /// The value is the upper edge of the range holding that rank, clamped to
    /// the exact observed extremes. Returns 0 for an empty distribution; callers
    /// check [`sample_count`](Self::sample_count) first.
    pub fn percentile(&self, p: f64) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let value_ns = self.histogram.value_at_quantile(p.clamp(0.0, 1.0));
        self.clamp_to_observed(value_ns)
    }

    /// Count the samples whose latency lies in `[low_us, high_us)`
    ///
    /// Compares the recorded latencies themselves (at nanosecond resolution),
    /// so the result does not depend on the histogram's range widths.
    ///
    /// ## Parameters
    /// - `low_us`: Inclusive lower bound in microseconds
    /// - `high_us`: Exclusive upper bound in microseconds; may be `f64::INFINITY`
    ///
    /// ## Returns
    /// Number of samples in the range; 0 for an empty distribution or an empty range
    pub fn count_in_range(&self, low_us: f64, high_us: f64) -> u64 {
        self.hits
            .iter()
            .filter(|&(&value_ns, _)| {
                let value_us = value_ns as f64 / NANOS_PER_MICRO;
                value_us >= low_us && value_us < high_us
            })
            .map(|(_, &count)| count)
            .sum()
    }

    fn clamp_to_observed(&self, value_ns: u64) -> f64 {
        (value_ns as f64 / NANOS_PER_MICRO).clamp(self.moments.min(), self.moments.max())
    }
}

impl fmt::Debug for LatencyDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatencyDistribution")
            .field("samples", &self.moments.count())
            .field("bins", &self.bin_count())
            .field("distinct_values", &self.hits.len())
            .field("min_us", &self.moments.min())
            .field("max_us", &self.moments.max())
            .field("mean_us", &self.moments.mean())
            .finish()
    }
}

fn to_nanos(latency_us: f64) -> u64 {
    (latency_us * NANOS_PER_MICRO).round() as u64
}

/// Serialized form: exact per-value counts and the moments.
///
/// The histogram is rebuilt from the values on load.
#[derive(Debug, Serialize, Deserialize)]
struct DistributionSnapshot {
    moments: Moments,
    values: Vec<RecordedValue>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordedValue {
    value_ns: u64,
    count: u64,
}

impl From<LatencyDistribution> for DistributionSnapshot {
    fn from(distribution: LatencyDistribution) -> Self {
        let values = distribution
            .hits
            .iter()
            .map(|(&value_ns, &count)| RecordedValue { value_ns, count })
            .collect();

        Self {
            moments: distribution.moments,
            values,
        }
    }
}

impl TryFrom<DistributionSnapshot> for LatencyDistribution {
    type Error = ReportError;

    fn try_from(snapshot: DistributionSnapshot) -> Result<Self> {
        let mut distribution = LatencyDistribution::new()?;
        for value in &snapshot.values {
            distribution.histogram.record_n(value.value_ns, value.count)?;
            *distribution.hits.entry(value.value_ns).or_insert(0) += value.count;
        }
        distribution.moments = snapshot.moments;
        Ok(distribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn distribution_of(samples: &[f64]) -> LatencyDistribution {
        let mut distribution = LatencyDistribution::new().unwrap();
        for &sample in samples {
            distribution.record(sample).unwrap();
        }
        distribution
    }

    fn random_samples(seed: u64, count: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count).map(|_| rng.gen_range(10.0..50_000.0)).collect()
    }

    fn assert_close(left: f64, right: f64) {
        let tolerance = 1e-9 * left.abs().max(right.abs()).max(1.0);
        assert!(
            (left - right).abs() <= tolerance,
            "{} and {} differ by more than {}",
            left,
            right,
            tolerance
        );
    }

    #[test]
    fn test_moments_match_two_pass_statistics() {
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mut moments = Moments::default();
        samples.iter().for_each(|&s| moments.push(s));

        assert_eq!(moments.count(), 8);
        assert_close(moments.mean(), 5.0);
        assert_close(moments.std_dev(), 2.0);
        assert_eq!(moments.min(), 2.0);
        assert_eq!(moments.max(), 9.0);
    }

    #[test]
    fn test_moments_combine_equals_single_pass() {
        let samples = random_samples(1, 500);
        let (left, right) = samples.split_at(173);

        let mut whole = Moments::default();
        samples.iter().for_each(|&s| whole.push(s));

        let mut merged = Moments::default();
        left.iter().for_each(|&s| merged.push(s));
        let mut tail = Moments::default();
        right.iter().for_each(|&s| tail.push(s));
        merged.combine(&tail);

        assert_eq!(merged.count(), whole.count());
        assert_close(merged.mean(), whole.mean());
        assert_close(merged.std_dev(), whole.std_dev());
        assert_eq!(merged.min(), whole.min());
        assert_eq!(merged.max(), whole.max());
    }

    #[test]
    fn test_empty_distribution() {
        let distribution = LatencyDistribution::new().unwrap();
        assert!(distribution.is_empty());
        assert_eq!(distribution.sample_count(), 0);
        assert_eq!(distribution.bin_count(), 0);
        assert_eq!(distribution.percentile(0.5), 0.0);
        assert_eq!(distribution.count_in_range(0.0, f64::INFINITY), 0);
    }

    #[test]
    fn test_identical_samples_report_exact_values() {
        let distribution = distribution_of(&[1000.0; 100]);

        assert_eq!(distribution.sample_count(), 100);
        assert_eq!(distribution.bin_count(), 1);
        assert_eq!(distribution.average(), 1000.0);
        assert_eq!(distribution.std_dev(), 0.0);
        for p in [0.01, 0.5, 0.99, 0.999_999_999] {
            assert_eq!(distribution.percentile(p), 1000.0);
        }
    }

    #[test]
    fn test_merge_empty_is_identity() {
        let mut distribution = distribution_of(&random_samples(2, 200));
        let before_avg = distribution.average();
        let before_p90 = distribution.percentile(0.9);

        distribution
            .merge(&LatencyDistribution::new().unwrap())
            .unwrap();

        assert_eq!(distribution.sample_count(), 200);
        assert_eq!(distribution.average(), before_avg);
        assert_eq!(distribution.percentile(0.9), before_p90);
    }

    #[test]
    fn test_merge_is_associative_and_commutative() {
        let a = distribution_of(&random_samples(3, 300));
        let b = distribution_of(&random_samples(4, 150));
        let c = distribution_of(&random_samples(5, 75));

        // (A + B) + C
        let mut left = a.clone();
        left.merge(&b).unwrap();
        left.merge(&c).unwrap();

        // A + (B + C)
        let mut bc = b.clone();
        bc.merge(&c).unwrap();
        let mut right = a.clone();
        right.merge(&bc).unwrap();

        // B + (A + C)
        let mut ac = a.clone();
        ac.merge(&c).unwrap();
        let mut swapped = b.clone();
        swapped.merge(&ac).unwrap();

        for other in [&right, &swapped] {
            assert_eq!(left.sample_count(), other.sample_count());
            assert_eq!(left.bin_count(), other.bin_count());
            assert_close(left.average(), other.average());
            assert_close(left.std_dev(), other.std_dev());
            for p in [0.1, 0.5, 0.9, 0.99] {
                assert_eq!(left.percentile(p), other.percentile(p));
            }
        }
    }

    #[test]
    fn test_percentiles_are_monotonic() {
        let distribution = distribution_of(&random_samples(6, 1000));
        let mut previous = distribution.min();
        for step in 1..1000 {
            let value = distribution.percentile(step as f64 / 1000.0);
            assert!(value >= previous, "p{} went backwards", step);
            previous = value;
        }
        assert!(previous <= distribution.max());
    }

    #[test]
    fn test_percentile_resolution_is_bounded() {
        let samples = random_samples(7, 2000);
        let distribution = distribution_of(&samples);

        let mut sorted = samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let exact = sorted[(0.95 * sorted.len() as f64).ceil() as usize - 1];

        let estimate = distribution.percentile(0.95);
        assert!((estimate - exact).abs() <= exact * 0.002);
    }

    #[test]
    fn test_count_in_range_is_half_open() {
        let distribution = distribution_of(&[500.0, 1000.0, 2000.0, 10_000.0]);

        assert_eq!(distribution.count_in_range(0.0, 1000.0), 1);
        assert_eq!(distribution.count_in_range(1000.0, 5000.0), 2);
        assert_eq!(distribution.count_in_range(5000.0, f64::INFINITY), 1);
        assert_eq!(distribution.count_in_range(0.0, f64::INFINITY), 4);
    }

    #[test]
    fn test_count_in_range_uses_exact_latencies() {
        // 999.95 us shares a histogram range with values above 1 ms.
        let distribution = distribution_of(&[999.95, 3000.0]);

        assert_eq!(distribution.count_in_range(0.0, 1000.0), 1);
        assert_eq!(distribution.count_in_range(1000.0, 5000.0), 1);
    }

    #[test]
    fn test_merged_counts_stay_exact() {
        let mut left = distribution_of(&[999.999, 1000.0]);
        left.merge(&distribution_of(&[999.999, 4999.5, 5000.0])).unwrap();

        assert_eq!(left.count_in_range(0.0, 1000.0), 2);
        assert_eq!(left.count_in_range(1000.0, 5000.0), 2);
        assert_eq!(left.count_in_range(5000.0, f64::INFINITY), 1);
    }

    #[test]
    fn test_serde_preserves_statistics() {
        let distribution = distribution_of(&random_samples(8, 400));
        let json = serde_json::to_string(&distribution).unwrap();
        let restored: LatencyDistribution = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.sample_count(), distribution.sample_count());
        assert_eq!(restored.bin_count(), distribution.bin_count());
        assert_close(restored.average(), distribution.average());
        assert_close(restored.percentile(0.75), distribution.percentile(0.75));
        assert_eq!(
            restored.count_in_range(1000.0, 20_000.0),
            distribution.count_in_range(1000.0, 20_000.0)
        );
    }
}
