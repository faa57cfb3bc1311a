//! Error type shared by the aggregation and report layers.

use thiserror::Error;

/// Failures raised while building aggregates or writing the results document.
///
/// Degenerate measurements (zero samples, zero duration, idle processors) are
/// not errors; they are handled where the statistic is derived.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create latency histogram: {0}")]
    HistogramCreation(#[from] hdrhistogram::CreationError),

    #[error("failed to record latency sample: {0}")]
    HistogramRecord(#[from] hdrhistogram::RecordError),

    #[error("failed to merge latency histograms: {0}")]
    HistogramAddition(#[from] hdrhistogram::AdditionError),

    #[error("cannot merge bucketizers with different bucket widths ({left} ms vs {right} ms)")]
    BucketWidthMismatch { left: u32, right: u32 },

    #[error("invalid latency bucket list: {0}")]
    InvalidBucketList(String),

    #[error("no time span configuration for result entry {0}")]
    MissingTimeSpan(usize),

    #[error("failed to write results document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("results document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
