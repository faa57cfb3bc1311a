use anyhow::Result;
use io_report::{
    FormatPolicy, IoDirection, ProcessorTopology, ProfileConfig, ResultsManager, RunCapture,
    SystemInfo, TargetResults, ThreadResults, TimeSpanConfig, TimeSpanResults,
};
use tempfile::tempdir;

fn mixed_capture() -> Result<RunCapture> {
    let mut threads = Vec::new();
    for thread in 0..2 {
        let mut target = TargetResults::new(format!("/data/file{}.dat", thread), 500)?;
        for i in 0..40 {
            let direction = if i % 4 == 0 {
                IoDirection::Write
            } else {
                IoDirection::Read
            };
            target.record(direction, 65536, i as f64 * 37.5, 150.0 + (i * 13 % 200) as f64)?;
        }
        threads.push(ThreadResults {
            targets: vec![target],
        });
    }

    Ok(RunCapture {
        system: SystemInfo::with_topology("bench02", ProcessorTopology::single_group(8)),
        profile: ProfileConfig {
            histogram_bucket_list: Some(vec![0.1, 0.25, f64::INFINITY]),
            time_spans: vec![TimeSpanConfig {
                measure_latency: true,
                calculate_iops_std_dev: true,
                io_bucket_duration_ms: 500,
                ..TimeSpanConfig::default()
            }],
        },
        results: vec![TimeSpanResults {
            test_time_seconds: 1.5,
            threads,
            ..TimeSpanResults::default()
        }],
    })
}

/// A capture written to disk renders the same document as the in-memory one.
#[test]
fn saved_capture_renders_identically() -> Result<()> {
    let dir = tempdir()?;
    let capture_path = dir.path().join("capture.json");
    let capture = mixed_capture()?;
    ResultsManager::save_capture(&capture_path, &capture)?;

    let manager = ResultsManager::new(&dir.path().join("report.xml"), FormatPolicy::default());
    let direct = manager.render(&capture)?;
    let loaded = manager.render(&ResultsManager::load_capture(&capture_path)?)?;

    assert_eq!(direct, loaded);
    Ok(())
}

#[test]
fn finalize_writes_every_section() -> Result<()> {
    let dir = tempdir()?;
    let output = dir.path().join("report.xml");
    let manager = ResultsManager::new(&output, FormatPolicy::default());

    let written = manager.finalize(&mixed_capture()?)?;
    let document = std::fs::read_to_string(&output)?;

    assert_eq!(written, document.len());
    assert!(document.contains("<LatencyBuckets>0.1,0.25,max</LatencyBuckets>"));
    assert_eq!(document.matches("<Thread>").count(), 2);
    // Time span summary plus one per target.
    assert_eq!(document.matches("<FixedBucketLatency>").count(), 3);
    assert_eq!(document.matches("<Iops>").count(), 3);
    assert!(document.contains("<Path>/data/file1.dat</Path>"));
    assert!(document.contains("SampleMillisecond=\"1500\""));
    assert!(!document.contains("SampleMillisecond=\"2000\""));
    Ok(())
}

#[test]
fn malformed_capture_is_reported() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{\"system\": 42}")?;

    let error = ResultsManager::load_capture(&path).unwrap_err();
    assert!(error.to_string().contains("Failed to parse capture file"));
    Ok(())
}
