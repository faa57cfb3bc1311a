//! # Storage Benchmark Report Library
//!
//! Summarizes the raw measurements of a storage I/O benchmark run into a
//! structured XML results document.
//!
//! ## Architecture Overview
//!
//! - `metrics`: mergeable latency distributions (HDR histogram plus exact moments)
//! - `bucketizer`: fixed-width time buckets of completions, for IOPS over time
//! - `cpu`: per-processor and averaged CPU utilization from tick deltas
//! - `report`: the report assembler that walks the result tree and writes XML
//! - `results`: the result tree, host/profile descriptions and capture loading
//! - `cli`, `logging`: the command-line surface of the `io-report` binary
//!
//! ## Usage Example
//!
//! ```rust
//! use io_report::{
//!     FormatPolicy, IoDirection, ProcessorTopology, ProfileConfig, ReportAssembler,
//!     SystemInfo, TargetResults, ThreadResults, TimeSpanConfig, TimeSpanResults,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut target = TargetResults::new("/dev/sdb", 1000)?;
//! for i in 0..100 {
//!     target.record(IoDirection::Read, 4096, i as f64 * 10.0, 1000.0)?;
//! }
//!
//! let profile = ProfileConfig {
//!     histogram_bucket_list: None,
//!     time_spans: vec![TimeSpanConfig { measure_latency: true, ..TimeSpanConfig::default() }],
//! };
//! let system = SystemInfo::with_topology("bench01", ProcessorTopology::single_group(4));
//! let results = vec![TimeSpanResults {
//!     test_time_seconds: 1.0,
//!     threads: vec![ThreadResults { targets: vec![target] }],
//!     ..TimeSpanResults::default()
//! }];
//!
//! let document = ReportAssembler::new(FormatPolicy::default()).assemble(&profile, &system, &results)?;
//! assert!(document.contains("<ReadAverageLatencyMilliseconds>1.000</ReadAverageLatencyMilliseconds>"));
//! # Ok(())
//! # }
//! ```

/// Latency frequency distributions
///
/// HDR histogram ranges give percentiles and range counts; running moments give
/// exact min, max, mean and standard deviation. Distributions merge losslessly.
pub mod metrics;

/// Fixed-width time buckets of I/O completions
pub mod bucketizer;

/// CPU utilization from per-processor tick deltas
pub mod cpu;

/// Run result tree, host and profile descriptions, and capture handling
///
/// Also hosts the `ResultsManager` used by the binary to load a JSON capture and
/// write the finished document.
pub mod results;

/// XML results document assembly
pub mod report;

/// Command-line interface and configuration
pub mod cli;

pub mod error;
pub mod logging;
pub mod utils;

pub use bucketizer::{IoBucket, IoBucketizer};
pub use cpu::{CpuUtilization, ProcessorGroup, ProcessorPerformance, ProcessorTopology};
pub use error::{ReportError, Result};
pub use metrics::{LatencyDistribution, Moments};
pub use report::{FormatPolicy, Profile, ReportAssembler, SystemInformation};
pub use results::{
    IoDirection, ProfileConfig, ResultsManager, RunCapture, SystemInfo, TargetResults,
    ThreadResults, TimeSpanConfig, TimeSpanResults,
};

/// The current version of the report generator
///
/// Written into the `<System>` fragment of every document.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Default output file name
    pub const OUTPUT_FILE: &str = "io_report.xml";

    /// Decimal places for values reported in milliseconds
    pub const MILLISECONDS_PRECISION: usize = 3;

    /// Decimal places for values reported in seconds
    pub const SECONDS_PRECISION: usize = 2;

    /// Decimal places for percentages
    pub const PERCENT_PRECISION: usize = 2;

    /// Width of one IOPS time bucket
    ///
    /// One second matches the granularity most storage dashboards plot.
    pub const IO_BUCKET_DURATION_MS: u32 = 1000;

    /// Default measured duration of a time span
    pub const DURATION_SECONDS: u32 = 10;

    /// Default warmup before measurement starts
    pub const WARMUP_SECONDS: u32 = 5;
}
