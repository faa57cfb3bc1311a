use crate::report::FormatPolicy;
use crate::utils::{format_bucket_list, parse_bucket_list};
use clap::Parser;
use std::path::PathBuf;

/// Storage benchmark report generator - renders the XML results document from a run capture
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Run capture (JSON) written by the measurement engine
    #[clap(short = 'i', long, help_heading = "Core Options")]
    pub input: PathBuf,

    /// Output file for the results document (XML format)
    #[clap(short = 'o', long = "output", default_value = crate::defaults::OUTPUT_FILE, help_heading = "Core Options")]
    pub output_file: PathBuf,

    /// Latency bucket upper bounds in milliseconds, comma separated; `max` closes the last bucket
    ///
    /// Overrides the bucket list stored in the capture's profile.
    #[clap(short = 'b', long, value_parser = parse_latency_buckets, help_heading = "Core Options")]
    pub latency_buckets: Option<LatencyBuckets>,

    /// Decimal places for millisecond values
    #[clap(long, default_value_t = crate::defaults::MILLISECONDS_PRECISION, help_heading = "Formatting")]
    pub milliseconds_precision: usize,

    /// Decimal places for second values
    #[clap(long, default_value_t = crate::defaults::SECONDS_PRECISION, help_heading = "Formatting")]
    pub seconds_precision: usize,

    /// Decimal places for percentages
    #[clap(long, default_value_t = crate::defaults::PERCENT_PRECISION, help_heading = "Formatting")]
    pub percent_precision: usize,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// Colorize log output by level
    #[clap(long, default_value_t = false)]
    pub color: bool,
}

impl Args {
    /// Numeric formatting selected on the command line.
    pub fn format_policy(&self) -> FormatPolicy {
        FormatPolicy {
            milliseconds: self.milliseconds_precision,
            seconds: self.seconds_precision,
            percent: self.percent_precision,
        }
    }
}

/// Validated latency bucket bounds given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyBuckets(pub Vec<f64>);

impl LatencyBuckets {
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl std::fmt::Display for LatencyBuckets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format_bucket_list(&self.0))
    }
}

fn parse_latency_buckets(s: &str) -> Result<LatencyBuckets, String> {
    parse_bucket_list(s)
        .map(LatencyBuckets)
        .map_err(|e| e.to_string())
}
