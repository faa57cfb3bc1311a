//! # Run Results
//!
//! The measured result tree for a storage benchmark run (time spans, threads,
//! targets), the host and profile descriptions that accompany it, and the
//! [`ResultsManager`] that turns a JSON capture into the XML results document.
//!
//! A capture file is produced by the measurement engine once all workers have
//! stopped. Everything here is plain data: the report layer only reads it.

use crate::bucketizer::IoBucketizer;
use crate::cpu::{ProcessorPerformance, ProcessorTopology};
use crate::metrics::LatencyDistribution;
use crate::report::{FormatPolicy, Profile, ReportAssembler, SystemInformation, XmlEmitter};
use crate::utils::format_bucket_list;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Direction of a completed I/O operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoDirection {
    Read,
    Write,
}

/// Counters and latency data for one file or device accessed by one thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetResults {
    pub path: String,
    pub bytes_count: u64,
    pub file_size: u64,
    pub io_count: u64,
    pub read_bytes: u64,
    pub read_count: u64,
    pub write_bytes: u64,
    pub write_count: u64,
    pub read_latency: LatencyDistribution,
    pub write_latency: LatencyDistribution,
    pub read_bucketizer: IoBucketizer,
    pub write_bucketizer: IoBucketizer,
}

impl TargetResults {
    pub fn new(path: impl Into<String>, io_bucket_duration_ms: u32) -> crate::Result<Self> {
        Ok(Self {
            path: path.into(),
            bytes_count: 0,
            file_size: 0,
            io_count: 0,
            read_bytes: 0,
            read_count: 0,
            write_bytes: 0,
            write_count: 0,
            read_latency: LatencyDistribution::new()?,
            write_latency: LatencyDistribution::new()?,
            read_bucketizer: IoBucketizer::new(io_bucket_duration_ms),
            write_bucketizer: IoBucketizer::new(io_bucket_duration_ms),
        })
    }

    /// Account one completed operation.
    ///
    /// `completion_ms` is measured from the start of the time span's measured
    /// window; `latency_us` is the operation's service time.
    pub fn record(
        &mut self,
        direction: IoDirection,
        bytes: u64,
        completion_ms: f64,
        latency_us: f64,
    ) -> crate::Result<()> {
        self.bytes_count += bytes;
        self.io_count += 1;

        match direction {
            IoDirection::Read => {
                self.read_bytes += bytes;
                self.read_count += 1;
                self.read_latency.record(latency_us)?;
                self.read_bucketizer.add(completion_ms, latency_us);
            }
            IoDirection::Write => {
                self.write_bytes += bytes;
                self.write_count += 1;
                self.write_latency.record(latency_us)?;
                self.write_bucketizer.add(completion_ms, latency_us);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadResults {
    pub targets: Vec<TargetResults>,
}

/// Which kernel event classes the tracing session collected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtwMask {
    pub process: bool,
    pub thread: bool,
    pub image_load: bool,
    pub disk_io: bool,
    pub memory_page_faults: bool,
    pub memory_hard_faults: bool,
    pub network: bool,
    pub registry: bool,
}

/// Event counts collected by the kernel tracing session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtwEventCounters {
    pub io_read: u64,
    pub io_write: u64,
    pub image_load: u64,
    pub copy_on_write: u64,
    pub demand_zero_fault: u64,
    pub guard_page_fault: u64,
    pub hard_page_fault: u64,
    pub transition_fault: u64,
    pub net_accept: u64,
    pub net_connect: u64,
    pub net_disconnect: u64,
    pub net_reconnect: u64,
    pub net_retransmit: u64,
    pub net_tcp_send: u64,
    pub net_tcp_receive: u64,
    pub net_udp_send: u64,
    pub net_udp_receive: u64,
    pub process_start: u64,
    pub process_end: u64,
    pub reg_create: u64,
    pub reg_delete: u64,
    pub reg_delete_value: u64,
    pub reg_enumerate_key: u64,
    pub reg_enumerate_value_key: u64,
    pub reg_flush: u64,
    pub reg_open: u64,
    pub reg_query: u64,
    pub reg_query_multiple_value: u64,
    pub reg_query_value: u64,
    pub reg_set_information: u64,
    pub reg_set_value: u64,
    pub thread_start: u64,
    pub thread_end: u64,
}

/// Buffer statistics of the kernel tracing session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtwSessionInfo {
    pub buffer_size_kb: u32,
    pub minimum_buffers: u32,
    pub maximum_buffers: u32,
    pub free_buffers: u32,
    pub buffers_written: u32,
    pub flush_timer_seconds: u32,
    pub age_limit_minutes: i32,
    pub allocated_buffers: u32,
    pub lost_events: u32,
    pub lost_log_buffers: u32,
    pub lost_real_time_buffers: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtwCapture {
    pub mask: EtwMask,
    pub counters: EtwEventCounters,
    pub session: EtwSessionInfo,
}

/// Results of one time span: its measured duration, CPU tick deltas, and the
/// per-thread target results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeSpanResults {
    pub test_time_seconds: f64,
    /// Tick deltas per logical processor, group by group.
    #[serde(default)]
    pub processor_performance: Vec<ProcessorPerformance>,
    pub threads: Vec<ThreadResults>,
    #[serde(default)]
    pub etw: Option<EtwCapture>,
}

impl TimeSpanResults {
    /// Every target of every thread, in thread order.
    pub fn targets(&self) -> impl Iterator<Item = &TargetResults> {
        self.threads.iter().flat_map(|thread| thread.targets.iter())
    }
}

/// Settings of one time span as configured in the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSpanConfig {
    pub duration_seconds: u32,
    pub warmup_seconds: u32,
    pub cooldown_seconds: u32,
    /// Fixed worker pool size; zero means threads are allocated per target.
    pub thread_count: u32,
    pub request_count: u32,
    pub measure_latency: bool,
    pub calculate_iops_std_dev: bool,
    pub io_bucket_duration_ms: u32,
}

impl Default for TimeSpanConfig {
    fn default() -> Self {
        Self {
            duration_seconds: crate::defaults::DURATION_SECONDS,
            warmup_seconds: crate::defaults::WARMUP_SECONDS,
            cooldown_seconds: 0,
            thread_count: 0,
            request_count: 0,
            measure_latency: false,
            calculate_iops_std_dev: false,
            io_bucket_duration_ms: crate::defaults::IO_BUCKET_DURATION_MS,
        }
    }
}

/// Run profile: global latency bucket bounds plus per-time-span settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Upper bounds in milliseconds, written as `"1,5,max"` in captures.
    #[serde(default, with = "bucket_list_serde")]
    pub histogram_bucket_list: Option<Vec<f64>>,
    pub time_spans: Vec<TimeSpanConfig>,
}

impl Profile for ProfileConfig {
    fn xml_fragment(&self) -> crate::Result<String> {
        let mut xml = XmlEmitter::new();
        xml.open("Profile")?;
        if let Some(bounds) = &self.histogram_bucket_list {
            xml.value("LatencyBuckets", &format_bucket_list(bounds))?;
        }
        xml.open("TimeSpans")?;
        for time_span in &self.time_spans {
            xml.open("TimeSpan")?;
            xml.value("Duration", &time_span.duration_seconds.to_string())?;
            xml.value("Warmup", &time_span.warmup_seconds.to_string())?;
            xml.value("Cooldown", &time_span.cooldown_seconds.to_string())?;
            xml.value("ThreadCount", &time_span.thread_count.to_string())?;
            xml.value("RequestCount", &time_span.request_count.to_string())?;
            xml.value("MeasureLatency", bool_text(time_span.measure_latency))?;
            xml.value("CalculateIopsStdDev", bool_text(time_span.calculate_iops_std_dev))?;
            xml.value("IoBucketDuration", &time_span.io_bucket_duration_ms.to_string())?;
            xml.close("TimeSpan")?;
        }
        xml.close("TimeSpans")?;
        xml.close("Profile")?;
        xml.finish()
    }

    fn histogram_bucket_list(&self) -> Option<&[f64]> {
        self.histogram_bucket_list.as_deref()
    }

    fn time_spans(&self) -> &[TimeSpanConfig] {
        &self.time_spans
    }
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Bucket lists travel as text because JSON has no infinity.
mod bucket_list_serde {
    use crate::utils::{format_bucket_list, parse_bucket_list};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bounds: &Option<Vec<f64>>, serializer: S) -> Result<S::Ok, S::Error> {
        match bounds {
            Some(bounds) => serializer.serialize_some(&format_bucket_list(bounds)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| parse_bucket_list(&text).map_err(D::Error::custom))
            .transpose()
    }
}

/// Host description recorded with the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub computer_name: String,
    pub os: String,
    pub architecture: String,
    pub tool_version: String,
    pub topology: ProcessorTopology,
}

impl SystemInfo {
    /// Describe the current host, with all logical processors in one group.
    pub fn collect() -> Self {
        let computer_name = std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .unwrap_or_else(|_| "localhost".to_string());
        Self::with_topology(computer_name, ProcessorTopology::single_group(num_cpus::get() as u32))
    }

    pub fn with_topology(computer_name: impl Into<String>, topology: ProcessorTopology) -> Self {
        Self {
            computer_name: computer_name.into(),
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            tool_version: crate::VERSION.to_string(),
            topology,
        }
    }
}

impl SystemInformation for SystemInfo {
    fn xml_fragment(&self) -> crate::Result<String> {
        let mut xml = XmlEmitter::new();
        xml.open("System")?;
        xml.value("ComputerName", &self.computer_name)?;
        xml.open("Tool")?;
        xml.value("Version", &self.tool_version)?;
        xml.close("Tool")?;
        xml.value("OS", &self.os)?;
        xml.value("Architecture", &self.architecture)?;
        xml.open("ProcessorTopology")?;
        for (index, group) in self.topology.groups.iter().enumerate() {
            xml.empty(
                "Group",
                &[
                    ("Group", index.to_string()),
                    ("MaximumProcessors", group.maximum_processor_count.to_string()),
                    ("ActiveProcessors", group.active_processor_count().to_string()),
                    ("ActiveProcessorMask", format!("0x{:x}", group.active_processor_mask)),
                ],
            )?;
        }
        xml.close("ProcessorTopology")?;
        xml.close("System")?;
        xml.finish()
    }

    fn active_processor_count(&self) -> u32 {
        self.topology.active_processor_count()
    }

    fn processor_topology(&self) -> &ProcessorTopology {
        &self.topology
    }
}

/// Everything needed to render a report, as handed over by the measurement engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCapture {
    pub system: SystemInfo,
    pub profile: ProfileConfig,
    pub results: Vec<TimeSpanResults>,
}

impl RunCapture {
    /// Total number of completed operations across all time spans.
    pub fn total_io_count(&self) -> u64 {
        self.results
            .iter()
            .flat_map(TimeSpanResults::targets)
            .map(|target| target.io_count)
            .sum()
    }
}

/// Loads captures and writes the finished results document.
pub struct ResultsManager {
    output_file: PathBuf,
    assembler: ReportAssembler,
}

impl ResultsManager {
    /// Create a new results manager
    pub fn new(output_file: &Path, format: FormatPolicy) -> Self {
        Self {
            output_file: output_file.to_path_buf(),
            assembler: ReportAssembler::new(format),
        }
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    /// Read a JSON capture from disk
    ///
    /// ## Parameters
    /// - `path`: Capture file written by the measurement engine or [`save_capture`](Self::save_capture)
    ///
    /// ## Returns
    /// - `Ok(RunCapture)`: The parsed system info, profile and time-span results
    /// - `Err`: The file could not be read or is not a valid capture; the error names the path
    pub fn load_capture(path: &Path) -> Result<RunCapture> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read capture file {:?}", path))?;
        let capture: RunCapture = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse capture file {:?}", path))?;
        debug!(
            "Loaded capture with {} time span(s) and {} I/O completions",
            capture.results.len(),
            capture.total_io_count()
        );
        Ok(capture)
    }

    /// Write a capture as pretty JSON.
    pub fn save_capture(path: &Path, capture: &RunCapture) -> Result<()> {
        let json = serde_json::to_string_pretty(capture).context("Failed to serialize capture")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write capture file {:?}", path))?;
        Ok(())
    }

    /// Render the results document without writing it.
    pub fn render(&self, capture: &RunCapture) -> Result<String> {
        let document = self
            .assembler
            .assemble(&capture.profile, &capture.system, &capture.results)
            .context("Failed to assemble results document")?;
        Ok(document)
    }

    /// Render the capture and write the document to the output file.
    ///
    /// Returns the number of bytes written.
    pub fn finalize(&self, capture: &RunCapture) -> Result<usize> {
        info!("Finalizing results for {}", capture.system.computer_name);

        let document = self.render(capture)?;
        std::fs::write(&self.output_file, &document)
            .with_context(|| format!("Failed to write results to {:?}", self.output_file))?;

        info!("Results written to: {:?}", self.output_file);
        Ok(document.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_capture() -> RunCapture {
        let mut target = TargetResults::new("/dev/sdb", 1000).unwrap();
        target.record(IoDirection::Read, 4096, 10.0, 250.0).unwrap();
        target.record(IoDirection::Write, 8192, 1200.0, 900.0).unwrap();

        RunCapture {
            system: SystemInfo::with_topology("bench01", ProcessorTopology::single_group(2)),
            profile: ProfileConfig {
                histogram_bucket_list: Some(vec![0.5, 1.0, f64::INFINITY]),
                time_spans: vec![TimeSpanConfig {
                    measure_latency: true,
                    calculate_iops_std_dev: true,
                    ..TimeSpanConfig::default()
                }],
            },
            results: vec![TimeSpanResults {
                test_time_seconds: 2.0,
                processor_performance: vec![ProcessorPerformance {
                    idle_time: 10,
                    kernel_time: 20,
                    user_time: 30,
                }],
                threads: vec![ThreadResults { targets: vec![target] }],
                etw: None,
            }],
        }
    }

    #[test]
    fn test_record_updates_counters() {
        let capture = sample_capture();
        let target = &capture.results[0].threads[0].targets[0];

        assert_eq!(target.io_count, 2);
        assert_eq!(target.bytes_count, 12288);
        assert_eq!(target.read_bytes, 4096);
        assert_eq!(target.read_count, 1);
        assert_eq!(target.write_bytes, 8192);
        assert_eq!(target.write_count, 1);
        assert_eq!(target.read_bucketizer.bucket_count(), 1);
        assert_eq!(target.write_bucketizer.bucket_count(), 2);
        assert_eq!(capture.total_io_count(), 2);
    }

    #[test]
    fn test_profile_fragment() {
        let capture = sample_capture();
        let fragment = capture.profile.xml_fragment().unwrap();

        assert!(fragment.starts_with("<Profile>\n<LatencyBuckets>0.5,1,max</LatencyBuckets>\n"));
        assert!(fragment.contains("<MeasureLatency>true</MeasureLatency>"));
        assert!(fragment.contains("<IoBucketDuration>1000</IoBucketDuration>"));
        assert!(fragment.ends_with("</Profile>\n"));
    }

    #[test]
    fn test_system_fragment_escapes_names() {
        let system = SystemInfo::with_topology("lab<1>", ProcessorTopology::single_group(4));
        let fragment = system.xml_fragment().unwrap();

        assert!(fragment.contains("<ComputerName>lab&lt;1&gt;</ComputerName>"));
        assert!(fragment.contains("ActiveProcessorMask=\"0xf\""));
        assert_eq!(system.active_processor_count(), 4);
    }

    #[test]
    fn test_capture_json_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.json");
        let capture = sample_capture();

        ResultsManager::save_capture(&path, &capture).unwrap();
        let loaded = ResultsManager::load_capture(&path).unwrap();

        assert_eq!(loaded.profile, capture.profile);
        assert_eq!(loaded.system, capture.system);
        let target = &loaded.results[0].threads[0].targets[0];
        assert_eq!(target.read_latency.sample_count(), 1);
        assert_eq!(target.write_bucketizer, capture.results[0].threads[0].targets[0].write_bucketizer);
    }

    #[test]
    fn test_invalid_bucket_list_in_capture_is_rejected() {
        let json = r#"{"histogram_bucket_list": "5,1", "time_spans": []}"#;
        assert!(serde_json::from_str::<ProfileConfig>(json).is_err());

        let json = r#"{"time_spans": [{"duration_seconds": 30}]}"#;
        let profile: ProfileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(profile.histogram_bucket_list, None);
        assert_eq!(profile.time_spans[0].duration_seconds, 30);
        assert_eq!(profile.time_spans[0].io_bucket_duration_ms, 1000);
    }

    #[test]
    fn test_finalize_writes_document() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("report.xml");
        let manager = ResultsManager::new(&output, FormatPolicy::default());
        assert_eq!(manager.output_file(), output.as_path());

        let written = manager.finalize(&sample_capture()).unwrap();
        let document = std::fs::read_to_string(&output).unwrap();

        assert_eq!(written, document.len());
        assert!(document.starts_with("<Results>\n<System>\n"));
        assert!(document.contains("<TestTimeSeconds>2.00</TestTimeSeconds>"));
        assert!(document.trim_end().ends_with("</Results>"));
    }

    #[test]
    fn test_load_missing_capture_reports_path() {
        let error = ResultsManager::load_capture(Path::new("/nonexistent/capture.json")).unwrap_err();
        assert!(error.to_string().contains("capture.json"));
    }
}
