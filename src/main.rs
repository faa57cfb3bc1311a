//! # Storage Benchmark Report Generator - Main Entry Point
//!
//! Loads a run capture written by the measurement engine and renders the XML
//! results document.
//!
//! 1. **Parse arguments**: capture path, output path, formatting precision
//! 2. **Initialize logging**: `tracing` with `RUST_LOG` support, optionally colorized
//! 3. **Load capture**: system info, profile and per-time-span results (JSON)
//! 4. **Apply overrides**: a latency bucket list given on the command line wins
//! 5. **Write report**: assemble the document and write it to the output file

use anyhow::Result;
use clap::Parser;
use io_report::{cli::Args, logging, results::ResultsManager, utils::format_bytes};
use tracing::info;

fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(args.verbose, args.color);

    info!("Starting storage benchmark report generator v{}", io_report::VERSION);
    info!("Configuration: {:?}", args);

    let mut capture = ResultsManager::load_capture(&args.input)?;

    if let Some(buckets) = args.latency_buckets.clone() {
        info!("Using latency buckets from the command line: {}", buckets);
        capture.profile.histogram_bucket_list = Some(buckets.into_inner());
    }

    let results_manager = ResultsManager::new(&args.output_file, args.format_policy());
    let written = results_manager.finalize(&capture)?;

    info!(
        "Report complete: {} time span(s), {} written to {:?}",
        capture.results.len(),
        format_bytes(written),
        results_manager.output_file()
    );
    Ok(())
}
