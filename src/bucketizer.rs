//! # Throughput Bucketizer
//!
//! Converts an irregular stream of completions into a fixed time grid. Bucket `i`
//! covers `[i * width, (i + 1) * width)` since the start of measurement and holds
//! the completion count plus latency moments for the operations that finished in
//! that window.
//!
//! The grid feeds two report sections: a condensed steadiness figure (standard
//! deviation of IOPS over time) and the full per-bucket time series.

use crate::error::{ReportError, Result};
use crate::metrics::Moments;
use serde::{Deserialize, Serialize};

const MILLIS_PER_SECOND: f64 = 1_000.0;

/// Completions that landed in one time window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IoBucket {
    latency: Moments,
}

impl IoBucket {
    /// Number of operations completed in this window.
    pub fn count(&self) -> u64 {
        self.latency.count()
    }

    /// A bucket is valid once any source has contributed a completion to it.
    pub fn is_valid(&self) -> bool {
        !self.latency.is_empty()
    }

    pub fn min_latency_us(&self) -> f64 {
        self.latency.min()
    }

    pub fn max_latency_us(&self) -> f64 {
        self.latency.max()
    }

    pub fn avg_latency_us(&self) -> f64 {
        self.latency.mean()
    }

    pub fn latency_std_dev_us(&self) -> f64 {
        self.latency.std_dev()
    }

    fn merge(&mut self, other: &IoBucket) {
        self.latency.combine(&other.latency);
    }
}

/// Fixed-width time-bucketed completion counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoBucketizer {
    bucket_duration_ms: u32,
    buckets: Vec<IoBucket>,
}

impl IoBucketizer {
    pub fn new(bucket_duration_ms: u32) -> Self {
        Self {
            bucket_duration_ms,
            buckets: Vec::new(),
        }
    }

    /// Width of every bucket; aggregates must share it to be merged.
    pub fn bucket_duration_ms(&self) -> u32 {
        self.bucket_duration_ms
    }

    /// Record a completion `completion_offset_ms` after measurement start.
    pub fn add(&mut self, completion_offset_ms: f64, latency_us: f64) {
        if self.bucket_duration_ms == 0 {
            return;
        }
        let index = (completion_offset_ms.max(0.0) / f64::from(self.bucket_duration_ms)) as usize;
        if index >= self.buckets.len() {
            self.buckets.resize(index + 1, IoBucket::default());
        }
        self.buckets[index].latency.push(latency_us);
    }

    /// Fold `other` into this bucketizer, aligning buckets by index.
    ///
    /// The shorter series behaves as if padded with empty buckets. Counts add,
    /// latency moments recombine by weight. Both sides must use the same bucket
    /// width unless `other` holds no buckets at all.
    pub fn merge(&mut self, other: &IoBucketizer) -> Result<()> {
        if other.buckets.is_empty() {
            return Ok(());
        }
        if self.bucket_duration_ms != other.bucket_duration_ms {
            return Err(ReportError::BucketWidthMismatch {
                left: self.bucket_duration_ms,
                right: other.bucket_duration_ms,
            });
        }

        if other.buckets.len() > self.buckets.len() {
            self.buckets.resize(other.buckets.len(), IoBucket::default());
        }
        for (mine, theirs) in self.buckets.iter_mut().zip(&other.buckets) {
            mine.merge(theirs);
        }
        Ok(())
    }

    /// Number of buckets up to and including the last one that saw a completion.
    ///
    /// Buckets inside that prefix may be empty if the target went idle mid-run;
    /// they are still part of the time series.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn bucket(&self, index: usize) -> Option<&IoBucket> {
        self.buckets.get(index)
    }

    /// Instantaneous IOPS for one bucket. Buckets past the end read as zero.
    pub fn throughput(&self, index: usize) -> f64 {
        let seconds = self.bucket_seconds();
        match self.buckets.get(index) {
            Some(bucket) if seconds > 0.0 => bucket.count() as f64 / seconds,
            _ => 0.0,
        }
    }

    /// Standard deviation of the per-bucket completion counts, expressed in IOPS.
    ///
    /// This measures how steady throughput was over time; it is unrelated to
    /// latency spread.
    pub fn iops_std_dev(&self) -> f64 {
        let seconds = self.bucket_seconds();
        if seconds <= 0.0 {
            return 0.0;
        }
        let mut counts = Moments::default();
        for bucket in &self.buckets {
            counts.push(bucket.count() as f64);
        }
        counts.std_dev() / seconds
    }

    fn bucket_seconds(&self) -> f64 {
        f64::from(self.bucket_duration_ms) / MILLIS_PER_SECOND
    }
}
