//! # Formatting Helpers
//!
//! Small numeric formatting and parsing helpers shared by the report writer and
//! the command-line surface.
//!
//! ## Usage Examples
//!
//! ```rust
//! use io_report::utils::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! assert_eq!(format_fixed(1.23456, 3), "1.235");
//! assert_eq!(format_bucket_bound(f64::INFINITY), "Max");
//!
//! let bounds = parse_bucket_list("0.5,1,5,max")?;
//! assert_eq!(bounds.len(), 4);
//! # Ok(())
//! # }
//! ```

use crate::error::{ReportError, Result};

/// Keyword accepted in bucket lists for the open-ended upper bucket.
pub const OPEN_BOUND_KEYWORD: &str = "max";

/// Format `value` with exactly `precision` decimal places.
pub fn format_fixed(value: f64, precision: usize) -> String {
    format!("{:.*}", precision, value)
}

/// Percentiles reported between the 0th and 100th, paired with the number of
/// decimals needed to print them without trailing zeroes.
///
/// Integer percentiles 1 through 99 come first, followed by the 99.9 ... 99.9999999
/// tail.
pub fn percentile_tiers() -> Vec<(usize, f64)> {
    let mut tiers: Vec<(usize, f64)> = (1..=99).map(|p| (0, f64::from(p))).collect();
    tiers.extend([
        (1, 99.9),
        (2, 99.99),
        (3, 99.999),
        (4, 99.9999),
        (5, 99.99999),
        (6, 99.999999),
        (7, 99.9999999),
    ]);
    tiers
}

/// True for the bound that closes the last fixed latency bucket.
pub fn is_open_bound(bound_ms: f64) -> bool {
    bound_ms.is_infinite() || bound_ms == f64::MAX
}

/// Label for a fixed latency bucket's upper bound.
pub fn format_bucket_bound(bound_ms: f64) -> String {
    if is_open_bound(bound_ms) {
        "Max".to_string()
    } else {
        format_fixed(bound_ms, 1)
    }
}

/// Parse a comma separated list of latency bucket upper bounds in milliseconds.
///
/// Bounds must be positive and strictly increasing. `max` may appear once, as
/// the last entry, to collect everything above the previous bound.
pub fn parse_bucket_list(list: &str) -> Result<Vec<f64>> {
    let mut bounds: Vec<f64> = Vec::new();

    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if let Some(&last) = bounds.last() {
            if is_open_bound(last) {
                return Err(ReportError::InvalidBucketList(format!(
                    "'{}' follows the open '{}' bound",
                    item, OPEN_BOUND_KEYWORD
                )));
            }
        }

        let bound = if item.eq_ignore_ascii_case(OPEN_BOUND_KEYWORD) {
            f64::INFINITY
        } else {
            item.parse::<f64>()
                .map_err(|_| ReportError::InvalidBucketList(format!("'{}' is not a number", item)))?
        };

        if bound.is_nan() || bound <= 0.0 {
            return Err(ReportError::InvalidBucketList(format!(
                "bound '{}' must be positive",
                item
            )));
        }
        if bounds.last().map_or(false, |&last| bound <= last) {
            return Err(ReportError::InvalidBucketList(format!(
                "bound '{}' is not greater than the previous one",
                item
            )));
        }
        bounds.push(bound);
    }

    if bounds.is_empty() {
        return Err(ReportError::InvalidBucketList("no bounds given".to_string()));
    }
    Ok(bounds)
}

/// Inverse of [`parse_bucket_list`].
pub fn format_bucket_list(bounds: &[f64]) -> String {
    bounds
        .iter()
        .map(|&bound| {
            if is_open_bound(bound) {
                OPEN_BOUND_KEYWORD.to_string()
            } else {
                bound.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Format bytes in a human-readable way
///
/// Uses binary (1024-based) scaling. Bytes show whole numbers, larger units two
/// decimal places.
///
/// ```rust
/// # use io_report::utils::format_bytes;
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// assert_eq!(format_bytes(2621440), "2.50 MB");
/// ```
pub fn format_bytes(bytes: usize) -> String {
    let bytes = bytes as f64;
    if bytes < 1024.0 {
        format!("{:.0} B", bytes)
    } else if bytes < 1024.0 * 1024.0 {
        format!("{:.2} KB", bytes / 1024.0)
    } else if bytes < 1024.0 * 1024.0 * 1024.0 {
        format!("{:.2} MB", bytes / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes / (1024.0 * 1024.0 * 1024.0))
    }
}
