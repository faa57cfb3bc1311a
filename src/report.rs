//! # Report Assembler
//!
//! Walks the result tree of a run (time spans, then threads, then targets) and
//! writes the XML results document. Aggregates (merged latency distributions,
//! merged bucketizers, CPU averages) are built on temporary objects; the input
//! tree is only read.
//!
//! ## Document Layout
//!
//! ```text
//! Results
//!   <system fragment> <profile fragment>
//!   TimeSpan*
//!     TestTimeSeconds ThreadCount RequestCount ProcCount
//!     CpuUtilization { CPU* Average }
//!     {Read,Write,}LatencyHistogramBins / AverageLatencyMilliseconds / StdevLatencyMilliseconds
//!     Latency { Bucket{Percentile ReadMilliseconds WriteMilliseconds TotalMilliseconds}* }
//!     FixedBucketLatency { Bucket{Time ReadCount WriteCount ReadWriteCount}* }
//!     Iops { {Read,Write,}IopsStdDev Bucket* }
//!     ETW ETWSessionInfo
//!     Thread* { Id Target* }
//!   or TimeSpan { Error } when nothing was measured
//! ```
//!
//! Output is deterministic: the same tree and settings always produce the same bytes.

use crate::bucketizer::IoBucketizer;
use crate::cpu::{CpuUtilization, ProcessorTopology, Utilization};
use crate::error::{ReportError, Result};
use crate::metrics::LatencyDistribution;
use crate::results::{
    EtwEventCounters, EtwMask, EtwSessionInfo, TargetResults, TimeSpanConfig, TimeSpanResults,
};
use crate::utils::{format_bucket_bound, format_fixed, percentile_tiers};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Durations below this many seconds mean the run stopped before measuring.
pub const MIN_MEASURED_SECONDS: f64 = 0.000_000_1;

pub const INTERRUPTED_MESSAGE: &str =
    "The test was interrupted before the measurements began. No results are displayed.";

/// Decimals used for the time-series latency attributes.
const SERIES_LATENCY_PRECISION: usize = 3;

/// Host description supplied alongside the results.
pub trait SystemInformation {
    /// Serialized `<System>` fragment, embedded verbatim.
    fn xml_fragment(&self) -> Result<String>;

    fn active_processor_count(&self) -> u32;

    fn processor_topology(&self) -> &ProcessorTopology;
}

/// Run configuration supplied alongside the results.
pub trait Profile {
    /// Serialized `<Profile>` fragment, embedded verbatim.
    fn xml_fragment(&self) -> Result<String>;

    /// Upper bounds in milliseconds for fixed-range latency buckets, if configured.
    fn histogram_bucket_list(&self) -> Option<&[f64]>;

    /// Settings for each time span, in the same order as the results.
    fn time_spans(&self) -> &[TimeSpanConfig];
}

/// Decimal places used for each category of numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatPolicy {
    pub milliseconds: usize,
    pub seconds: usize,
    pub percent: usize,
}

impl Default for FormatPolicy {
    fn default() -> Self {
        Self {
            milliseconds: crate::defaults::MILLISECONDS_PRECISION,
            seconds: crate::defaults::SECONDS_PRECISION,
            percent: crate::defaults::PERCENT_PRECISION,
        }
    }
}

/// Append-only XML sink. Every element ends with a newline.
pub(crate) struct XmlEmitter {
    writer: Writer<Vec<u8>>,
}

impl XmlEmitter {
    pub(crate) fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    pub(crate) fn open(&mut self, tag: &str) -> Result<()> {
        self.writer.write_event(Event::Start(BytesStart::new(tag)))?;
        self.newline();
        Ok(())
    }

    pub(crate) fn close(&mut self, tag: &str) -> Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        self.newline();
        Ok(())
    }

    /// `<tag>text</tag>`, with `text` escaped.
    pub(crate) fn value(&mut self, tag: &str, text: &str) -> Result<()> {
        self.writer.write_event(Event::Start(BytesStart::new(tag)))?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        self.newline();
        Ok(())
    }

    /// Self-closing element carrying only attributes.
    pub(crate) fn empty(&mut self, tag: &str, attributes: &[(&str, String)]) -> Result<()> {
        let mut element = BytesStart::new(tag);
        for (name, value) in attributes {
            element.push_attribute((*name, value.as_str()));
        }
        self.writer.write_event(Event::Empty(element))?;
        self.newline();
        Ok(())
    }

    /// Splice an already serialized fragment.
    pub(crate) fn raw(&mut self, fragment: &str) {
        self.writer.get_mut().extend_from_slice(fragment.as_bytes());
    }

    pub(crate) fn finish(self) -> Result<String> {
        Ok(String::from_utf8(self.writer.into_inner())?)
    }

    fn newline(&mut self) {
        self.writer.get_mut().push(b'\n');
    }
}

/// Emitter plus the numeric formatting rules, passed down the walk.
struct ReportWriter<'a> {
    xml: XmlEmitter,
    format: &'a FormatPolicy,
}

impl<'a> ReportWriter<'a> {
    fn seconds(&mut self, name: &str, value: f64) -> Result<()> {
        let text = format_fixed(value, self.format.seconds);
        self.xml.value(&format!("{}Seconds", name), &text)
    }

    fn percent(&mut self, name: &str, value: f64) -> Result<()> {
        let text = format_fixed(value, self.format.percent);
        self.xml.value(&format!("{}Percent", name), &text)
    }

    /// Microsecond `value` written in milliseconds under `name` unchanged.
    fn milliseconds(&mut self, name: &str, value_us: f64) -> Result<()> {
        let text = format_fixed(value_us / 1000.0, self.format.milliseconds);
        self.xml.value(name, &text)
    }

    fn in_milliseconds(&mut self, name: &str, value_us: f64) -> Result<()> {
        self.milliseconds(&format!("{}Milliseconds", name), value_us)
    }

    fn latency_in_milliseconds(&mut self, name: &str, value_us: f64) -> Result<()> {
        self.in_milliseconds(&format!("{}Latency", name), value_us)
    }

    fn count(&mut self, name: &str, value: impl ToString) -> Result<()> {
        self.xml.value(name, &value.to_string())
    }
}

/// Read, write and combined views of a latency population.
struct LatencyViews {
    read: LatencyDistribution,
    write: LatencyDistribution,
    total: LatencyDistribution,
}

impl LatencyViews {
    fn of<'t>(targets: impl IntoIterator<Item = &'t TargetResults>) -> Result<Self> {
        let mut views = Self {
            read: LatencyDistribution::new()?,
            write: LatencyDistribution::new()?,
            total: LatencyDistribution::new()?,
        };
        for target in targets {
            views.read.merge(&target.read_latency)?;
            views.write.merge(&target.write_latency)?;
            views.total.merge(&target.write_latency)?;
            views.total.merge(&target.read_latency)?;
        }
        Ok(views)
    }

    fn columns(&self) -> [(&'static str, &LatencyDistribution); 3] {
        [("Read", &self.read), ("Write", &self.write), ("Total", &self.total)]
    }
}

/// Builds the results document for a completed run.
#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    format: FormatPolicy,
}

impl ReportAssembler {
    pub fn new(format: FormatPolicy) -> Self {
        Self { format }
    }

    /// Render the whole results document
    ///
    /// `results[i]` is reported with `profile.time_spans()[i]`. A time span whose
    /// duration is effectively zero gets an `Error` marker instead of details;
    /// the other time spans are still written. The input tree is only read, so
    /// assembling twice yields the same bytes.
    ///
    /// ## Parameters
    /// - `profile`: Run configuration; supplies the `<Profile>` fragment, the
    ///   fixed latency bucket bounds and the per-time-span settings
    /// - `system`: Host description; supplies the `<System>` fragment and the
    ///   processor topology for CPU utilization
    /// - `results`: Measured time spans, in run order
    ///
    /// ## Returns
    /// - `Ok(String)`: The complete `<Results>` document
    /// - `Err(ReportError::MissingTimeSpan)`: `results` has more entries than the profile has time spans
    /// - `Err(ReportError)`: A fragment or histogram operation failed
    pub fn assemble(
        &self,
        profile: &dyn Profile,
        system: &dyn SystemInformation,
        results: &[TimeSpanResults],
    ) -> Result<String> {
        info!("Assembling report for {} time span(s)", results.len());

        let mut out = ReportWriter {
            xml: XmlEmitter::new(),
            format: &self.format,
        };

        out.xml.open("Results")?;
        out.xml.raw(&system.xml_fragment()?);
        out.xml.raw(&profile.xml_fragment()?);
        for (index, time_span) in results.iter().enumerate() {
            let settings = profile
                .time_spans()
                .get(index)
                .ok_or(ReportError::MissingTimeSpan(index))?;
            write_time_span(&mut out, profile, system, settings, time_span)?;
        }
        out.xml.close("Results")?;

        out.xml.finish()
    }
}

fn write_time_span(
    out: &mut ReportWriter<'_>,
    profile: &dyn Profile,
    system: &dyn SystemInformation,
    settings: &TimeSpanConfig,
    results: &TimeSpanResults,
) -> Result<()> {
    out.xml.open("TimeSpan")?;

    let test_time = results.test_time_seconds;
    if test_time >= MIN_MEASURED_SECONDS {
        // Either a fixed pool of threads shares all targets, or each target
        // gets its own threads and the results list all of them.
        let thread_count = if settings.thread_count > 0 {
            settings.thread_count as usize
        } else {
            results.threads.len()
        };

        out.seconds("TestTime", test_time)?;
        out.count("ThreadCount", thread_count)?;
        out.count("RequestCount", settings.request_count)?;
        out.count("ProcCount", system.active_processor_count())?;

        let cpu = CpuUtilization::compute(system.processor_topology(), &results.processor_performance);
        write_cpu_utilization(out, &cpu)?;

        if settings.measure_latency {
            let views = LatencyViews::of(results.targets())?;
            write_latency_summary(out, &views, profile.histogram_bucket_list())?;
        }

        if settings.calculate_iops_std_dev {
            write_overall_iops(out, results, settings.io_bucket_duration_ms)?;
        }

        if let Some(etw) = &results.etw {
            write_etw(out, &etw.mask, &etw.counters)?;
            write_etw_session_info(out, &etw.session)?;
        }

        for (thread_id, thread) in results.threads.iter().enumerate() {
            out.xml.open("Thread")?;
            out.count("Id", thread_id)?;
            for target in &thread.targets {
                out.xml.open("Target")?;
                write_target(out, target, settings, profile.histogram_bucket_list())?;
                out.xml.close("Target")?;
            }
            out.xml.close("Thread")?;
        }
    } else {
        warn!(
            "Time span lasted {} seconds; reporting it as interrupted",
            test_time
        );
        out.xml.value("Error", INTERRUPTED_MESSAGE)?;
    }

    out.xml.close("TimeSpan")
}

fn write_cpu_utilization(out: &mut ReportWriter<'_>, cpu: &CpuUtilization) -> Result<()> {
    out.xml.open("CpuUtilization")?;
    for processor in &cpu.processors {
        out.xml.open("CPU")?;
        out.count("Group", processor.group)?;
        out.count("Id", processor.id)?;
        write_utilization(out, &processor.utilization)?;
        out.xml.close("CPU")?;
    }
    out.xml.open("Average")?;
    write_utilization(out, &cpu.average)?;
    out.xml.close("Average")?;
    out.xml.close("CpuUtilization")
}

fn write_utilization(out: &mut ReportWriter<'_>, utilization: &Utilization) -> Result<()> {
    out.percent("Usage", utilization.usage)?;
    out.percent("User", utilization.user)?;
    out.percent("Kernel", utilization.kernel_busy())?;
    out.percent("Idle", utilization.idle)
}

fn write_target(
    out: &mut ReportWriter<'_>,
    target: &TargetResults,
    settings: &TimeSpanConfig,
    bucket_list: Option<&[f64]>,
) -> Result<()> {
    out.xml.value("Path", &target.path)?;
    out.count("BytesCount", target.bytes_count)?;
    out.count("FileSize", target.file_size)?;
    out.count("IOCount", target.io_count)?;
    out.count("ReadBytes", target.read_bytes)?;
    out.count("ReadCount", target.read_count)?;
    out.count("WriteBytes", target.write_bytes)?;
    out.count("WriteCount", target.write_count)?;

    if settings.measure_latency {
        let views = LatencyViews::of(std::iter::once(target))?;
        write_latency_summary(out, &views, bucket_list)?;
    }

    if settings.calculate_iops_std_dev {
        write_target_iops(out, target, settings.io_bucket_duration_ms)?;
    }
    Ok(())
}

fn write_latency_summary(
    out: &mut ReportWriter<'_>,
    views: &LatencyViews,
    bucket_list: Option<&[f64]>,
) -> Result<()> {
    for (name, distribution) in [("Read", &views.read), ("Write", &views.write), ("", &views.total)] {
        if distribution.sample_count() > 0 {
            out.count(&format!("{}LatencyHistogramBins", name), distribution.bin_count())?;
            out.latency_in_milliseconds(&format!("{}Average", name), distribution.average())?;
            out.latency_in_milliseconds(&format!("{}Stdev", name), distribution.std_dev())?;
        }
    }

    write_latency_percentiles(out, views)?;

    if let Some(bounds) = bucket_list {
        write_fixed_latency_buckets(out, views, bounds)?;
    }
    Ok(())
}

fn write_latency_percentiles(out: &mut ReportWriter<'_>, views: &LatencyViews) -> Result<()> {
    out.xml.open("Latency")?;

    // The extremes come from the exact observed values.
    write_percentile_row(out, views, "0", LatencyDistribution::min)?;
    for (decimals, p) in percentile_tiers() {
        write_percentile_row(out, views, &format_fixed(p, decimals), |distribution| {
            distribution.percentile(p / 100.0)
        })?;
    }
    write_percentile_row(out, views, "100", LatencyDistribution::max)?;

    out.xml.close("Latency")
}

fn write_percentile_row(
    out: &mut ReportWriter<'_>,
    views: &LatencyViews,
    label: &str,
    value_of: impl Fn(&LatencyDistribution) -> f64,
) -> Result<()> {
    out.xml.open("Bucket")?;
    out.xml.value("Percentile", label)?;
    for (name, distribution) in views.columns() {
        if distribution.sample_count() > 0 {
            out.in_milliseconds(name, value_of(distribution))?;
        }
    }
    out.xml.close("Bucket")
}

fn write_fixed_latency_buckets(
    out: &mut ReportWriter<'_>,
    views: &LatencyViews,
    bounds_ms: &[f64],
) -> Result<()> {
    out.xml.open("FixedBucketLatency")?;

    let mut low_us = 0.0;
    for &bound_ms in bounds_ms {
        let high_us = bound_ms * 1000.0;
        let read = views.read.count_in_range(low_us, high_us);
        let write = views.write.count_in_range(low_us, high_us);
        let total = views.total.count_in_range(low_us, high_us);

        out.xml.open("Bucket")?;
        out.xml.value("Time", &format_bucket_bound(bound_ms))?;
        for (name, count) in [("ReadCount", read), ("WriteCount", write), ("ReadWriteCount", total)] {
            if count > 0 {
                out.count(name, count)?;
            }
        }
        out.xml.close("Bucket")?;

        low_us = high_us;
    }

    out.xml.close("FixedBucketLatency")
}

/// Bucket width of the first series that holds data, else `fallback_ms`.
fn series_width<'b>(series: impl IntoIterator<Item = &'b IoBucketizer>, fallback_ms: u32) -> u32 {
    series
        .into_iter()
        .find(|bucketizer| bucketizer.bucket_count() > 0)
        .map_or(fallback_ms, IoBucketizer::bucket_duration_ms)
}

/// True when `bucketizer` can be folded into a series of `width_ms` buckets.
/// Series recorded at another width are left out of the aggregate.
fn fits_width(bucketizer: &IoBucketizer, width_ms: u32, path: &str) -> bool {
    if bucketizer.bucket_count() == 0 || bucketizer.bucket_duration_ms() == width_ms {
        return true;
    }
    warn!(
        "Skipping IOPS series of {} recorded with {} ms buckets; the report uses {} ms",
        path,
        bucketizer.bucket_duration_ms(),
        width_ms
    );
    false
}

fn write_overall_iops(
    out: &mut ReportWriter<'_>,
    results: &TimeSpanResults,
    fallback_width_ms: u32,
) -> Result<()> {
    let width_ms = series_width(
        results
            .targets()
            .flat_map(|target| [&target.read_bucketizer, &target.write_bucketizer]),
        fallback_width_ms,
    );

    let mut read = IoBucketizer::new(width_ms);
    let mut write = IoBucketizer::new(width_ms);
    for target in results.targets() {
        if fits_width(&target.read_bucketizer, width_ms, &target.path) {
            read.merge(&target.read_bucketizer)?;
        }
        if fits_width(&target.write_bucketizer, width_ms, &target.path) {
            write.merge(&target.write_bucketizer)?;
        }
    }
    write_iops(out, &read, &write, width_ms)
}

fn write_target_iops(
    out: &mut ReportWriter<'_>,
    target: &TargetResults,
    fallback_width_ms: u32,
) -> Result<()> {
    let read = &target.read_bucketizer;
    let width_ms = series_width([read, &target.write_bucketizer], fallback_width_ms);

    let unused = IoBucketizer::new(width_ms);
    let write = if fits_width(&target.write_bucketizer, width_ms, &target.path) {
        &target.write_bucketizer
    } else {
        &unused
    };
    write_iops(out, read, write, width_ms)
}

/// `read` and `write` must either be empty or use `bucket_duration_ms` buckets.
fn write_iops(
    out: &mut ReportWriter<'_>,
    read: &IoBucketizer,
    write: &IoBucketizer,
    bucket_duration_ms: u32,
) -> Result<()> {
    out.xml.open("Iops")?;

    let mut total = IoBucketizer::new(bucket_duration_ms);
    total.merge(read)?;
    total.merge(write)?;

    // Published documents carry these through the millisecond scaling.
    for (name, bucketizer) in [("ReadIopsStdDev", read), ("WriteIopsStdDev", write), ("IopsStdDev", &total)] {
        if bucketizer.bucket_count() > 0 {
            out.milliseconds(name, bucketizer.iops_std_dev())?;
        }
    }

    write_iops_series(out, read, write, bucket_duration_ms)?;

    out.xml.close("Iops")
}

/// One self-closing `Bucket` per time window, up to the longest of the two series.
fn write_iops_series(
    out: &mut ReportWriter<'_>,
    read: &IoBucketizer,
    write: &IoBucketizer,
    bucket_duration_ms: u32,
) -> Result<()> {
    let buckets = read.bucket_count().max(write.bucket_count());
    debug!("Writing {} IOPS time-series bucket(s)", buckets);

    for index in 0..buckets {
        let r = SeriesPoint::of(read, index);
        let w = SeriesPoint::of(write, index);
        let sample_ms = u64::from(bucket_duration_ms) * (index as u64 + 1);

        let latency = |value_us: f64| format_fixed(value_us / 1000.0, SERIES_LATENCY_PRECISION);
        out.xml.empty(
            "Bucket",
            &[
                ("SampleMillisecond", sample_ms.to_string()),
                ("Read", format_fixed(r.iops, 0)),
                ("Write", format_fixed(w.iops, 0)),
                ("Total", format_fixed(r.iops + w.iops, 0)),
                ("ReadMinLatencyMilliseconds", latency(r.min_us)),
                ("ReadMaxLatencyMilliseconds", latency(r.max_us)),
                ("ReadAvgLatencyMilliseconds", latency(r.avg_us)),
                ("ReadLatencyStdDev", latency(r.std_dev_us)),
                ("WriteMinLatencyMilliseconds", latency(w.min_us)),
                ("WriteMaxLatencyMilliseconds", latency(w.max_us)),
                ("WriteAvgLatencyMilliseconds", latency(w.avg_us)),
                ("WriteLatencyStdDev", latency(w.std_dev_us)),
            ],
        )?;
    }
    Ok(())
}

#[derive(Default)]
struct SeriesPoint {
    iops: f64,
    min_us: f64,
    max_us: f64,
    avg_us: f64,
    std_dev_us: f64,
}

impl SeriesPoint {
    fn of(bucketizer: &IoBucketizer, index: usize) -> Self {
        match bucketizer.bucket(index) {
            Some(bucket) => Self {
                iops: bucketizer.throughput(index),
                min_us: bucket.min_latency_us(),
                max_us: bucket.max_latency_us(),
                avg_us: bucket.avg_latency_us(),
                std_dev_us: bucket.latency_std_dev_us(),
            },
            None => Self::default(),
        }
    }
}

fn write_etw(out: &mut ReportWriter<'_>, mask: &EtwMask, counters: &EtwEventCounters) -> Result<()> {
    out.xml.open("ETW")?;
    if mask.disk_io {
        out.xml.open("DiskIO")?;
        out.count("Read", counters.io_read)?;
        out.count("Write", counters.io_write)?;
        out.xml.close("DiskIO")?;
    }
    if mask.image_load {
        out.count("LoadImage", counters.image_load)?;
    }
    if mask.memory_page_faults {
        out.xml.open("MemoryPageFaults")?;
        out.count("CopyOnWrite", counters.copy_on_write)?;
        out.count("DemandZeroFault", counters.demand_zero_fault)?;
        out.count("GuardPageFault", counters.guard_page_fault)?;
        out.count("HardPageFault", counters.hard_page_fault)?;
        out.count("TransitionFault", counters.transition_fault)?;
        out.xml.close("MemoryPageFaults")?;
    } else if mask.memory_hard_faults {
        out.count("HardPageFault", counters.hard_page_fault)?;
    }
    if mask.network {
        out.xml.open("Network")?;
        out.count("Accept", counters.net_accept)?;
        out.count("Connect", counters.net_connect)?;
        out.count("Disconnect", counters.net_disconnect)?;
        out.count("Reconnect", counters.net_reconnect)?;
        out.count("Retransmit", counters.net_retransmit)?;
        out.count("TCPIPSend", counters.net_tcp_send)?;
        out.count("TCPIPReceive", counters.net_tcp_receive)?;
        out.count("UDPIPSend", counters.net_udp_send)?;
        out.count("UDPIPReceive", counters.net_udp_receive)?;
        out.xml.close("Network")?;
    }
    if mask.process {
        out.xml.open("Process")?;
        out.count("Start", counters.process_start)?;
        out.count("End", counters.process_end)?;
        out.xml.close("Process")?;
    }
    if mask.registry {
        out.xml.open("Registry")?;
        out.count("NtCreateKey", counters.reg_create)?;
        out.count("NtDeleteKey", counters.reg_delete)?;
        out.count("NtDeleteValueKey", counters.reg_delete_value)?;
        out.count("NtEnumerateKey", counters.reg_enumerate_key)?;
        out.count("NtEnumerateValueKey", counters.reg_enumerate_value_key)?;
        out.count("NtFlushKey", counters.reg_flush)?;
        out.count("NtOpenKey", counters.reg_open)?;
        out.count("NtQueryKey", counters.reg_query)?;
        out.count("NtQueryMultipleValueKey", counters.reg_query_multiple_value)?;
        out.count("NtQueryValueKey", counters.reg_query_value)?;
        out.count("NtSetInformationKey", counters.reg_set_information)?;
        out.count("NtSetValueKey", counters.reg_set_value)?;
        out.xml.close("Registry")?;
    }
    if mask.thread {
        out.xml.open("Thread")?;
        out.count("Start", counters.thread_start)?;
        out.count("End", counters.thread_end)?;
        out.xml.close("Thread")?;
    }
    out.xml.close("ETW")
}

fn write_etw_session_info(out: &mut ReportWriter<'_>, session: &EtwSessionInfo) -> Result<()> {
    out.xml.open("ETWSessionInfo")?;
    out.count("BufferSizeKB", session.buffer_size_kb)?;
    // Tag spelling is what existing consumers parse.
    out.count("MinimimBuffers", session.minimum_buffers)?;
    out.count("MaximumBuffers", session.maximum_buffers)?;
    out.count("FreeBuffers", session.free_buffers)?;
    out.count("BuffersWritten", session.buffers_written)?;
    out.count("FlushTimerSeconds", session.flush_timer_seconds)?;
    out.count("AgeLimitMinutes", session.age_limit_minutes)?;
    out.count("AllocatedBuffers", session.allocated_buffers)?;
    out.count("LostEvents", session.lost_events)?;
    out.count("LostLogBuffers", session.lost_log_buffers)?;
    out.count("LostRealTimeBuffers", session.lost_real_time_buffers)?;
    out.xml.close("ETWSessionInfo")
}
