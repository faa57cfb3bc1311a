//! # CPU Utilization Aggregator
//!
//! Turns per-logical-processor tick deltas collected over a time span into
//! utilization percentages, per processor and averaged over the active ones.
//!
//! Processors are laid out group by group: counters for group `g` start right
//! after the slots of every earlier group (`maximum_processor_count` each).

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One processor group as reported by the platform topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorGroup {
    /// Number of processor slots in this group, populated or not.
    pub maximum_processor_count: u32,
    /// Bit `n` set when slot `n` holds an active processor.
    pub active_processor_mask: u64,
}

impl ProcessorGroup {
    pub fn is_processor_active(&self, processor: u32) -> bool {
        processor < u64::BITS && self.active_processor_mask & (1u64 << processor) != 0
    }

    pub fn active_processor_count(&self) -> u32 {
        self.active_processor_mask.count_ones()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorTopology {
    pub groups: Vec<ProcessorGroup>,
}

impl ProcessorTopology {
    /// Single group with `count` active processors.
    pub fn single_group(count: u32) -> Self {
        let count = count.min(u64::BITS);
        let mask = if count == u64::BITS {
            u64::MAX
        } else {
            (1u64 << count) - 1
        };
        Self {
            groups: vec![ProcessorGroup {
                maximum_processor_count: count,
                active_processor_mask: mask,
            }],
        }
    }

    pub fn active_processor_count(&self) -> u32 {
        self.groups.iter().map(ProcessorGroup::active_processor_count).sum()
    }
}

/// Tick deltas for one logical processor over a time span.
///
/// On the reference platform idle time is accounted inside kernel time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorPerformance {
    pub idle_time: u64,
    pub kernel_time: u64,
    pub user_time: u64,
}

/// Utilization figures in percent of `kernel + user` ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Utilization {
    /// `(kernel + user) - idle`, kept in this form for parity with published results.
    pub usage: f64,
    pub user: f64,
    /// Raw kernel share, idle included.
    pub kernel: f64,
    pub idle: f64,
}

impl Utilization {
    fn from_ticks(counters: &ProcessorPerformance) -> Option<Self> {
        let total = counters.kernel_time as f64 + counters.user_time as f64;
        if total <= 0.0 {
            return None;
        }

        let idle = 100.0 * counters.idle_time as f64 / total;
        let kernel = 100.0 * counters.kernel_time as f64 / total;
        let user = 100.0 * counters.user_time as f64 / total;

        Some(Self {
            usage: (kernel + user) - idle,
            user,
            kernel,
            idle,
        })
    }

    /// Kernel share with idle time taken out, as shown in the report.
    pub fn kernel_busy(&self) -> f64 {
        self.kernel - self.idle
    }

    fn accumulate(&mut self, other: &Utilization) {
        self.usage += other.usage;
        self.user += other.user;
        self.kernel += other.kernel;
        self.idle += other.idle;
    }

    fn divided_by(&self, divisor: f64) -> Self {
        Self {
            usage: self.usage / divisor,
            user: self.user / divisor,
            kernel: self.kernel / divisor,
            idle: self.idle / divisor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessorUtilization {
    pub group: u32,
    pub id: u32,
    pub utilization: Utilization,
}

/// Per-processor and averaged utilization for one time span.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuUtilization {
    pub processors: Vec<ProcessorUtilization>,
    pub average: Utilization,
}

impl CpuUtilization {
    /// Aggregate `counters` (indexed group by group) over the active processors
    /// described by `topology`.
    ///
    /// Inactive slots and processors with no kernel or user ticks are skipped.
    /// Averages divide by the number of processors actually visited, or by one
    /// when none were, so the result is always finite.
    ///
    /// ## Parameters
    /// - `topology`: Processor groups with their slot counts and active masks
    /// - `counters`: Tick deltas, one per slot; group `g` starts after the slots
    ///   of every earlier group. A shorter list stops at the first group it
    ///   does not reach.
    ///
    /// ## Returns
    /// Per-processor utilization for every visited processor, in topology
    /// order, plus the average over them
    pub fn compute(topology: &ProcessorTopology, counters: &[ProcessorPerformance]) -> Self {
        let mut processors = Vec::new();
        let mut totals = Utilization::default();
        let mut base = 0usize;

        for (group_index, group) in topology.groups.iter().enumerate() {
            // Counters may cover only the leading groups.
            if base >= counters.len() {
                break;
            }

            for processor in 0..group.maximum_processor_count {
                if !group.is_processor_active(processor) {
                    continue;
                }
                let Some(ticks) = counters.get(base + processor as usize) else {
                    continue;
                };
                let Some(utilization) = Utilization::from_ticks(ticks) else {
                    debug!(
                        "Skipping processor {}:{} with no recorded ticks",
                        group_index, processor
                    );
                    continue;
                };

                totals.accumulate(&utilization);
                processors.push(ProcessorUtilization {
                    group: group_index as u32,
                    id: processor,
                    utilization,
                });
            }

            base += group.maximum_processor_count as usize;
        }

        let divisor = if processors.is_empty() {
            warn!("No active processors with recorded ticks; CPU averages are reported as zero");
            1.0
        } else {
            processors.len() as f64
        };

        Self {
            average: totals.divided_by(divisor),
            processors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(kernel: u64, user: u64, idle: u64) -> ProcessorPerformance {
        ProcessorPerformance {
            idle_time: idle,
            kernel_time: kernel,
            user_time: user,
        }
    }

    #[test]
    fn test_single_processor_percentages() {
        let topology = ProcessorTopology::single_group(1);
        let cpu = CpuUtilization::compute(&topology, &[ticks(50, 30, 20)]);

        assert_eq!(cpu.processors.len(), 1);
        let utilization = cpu.processors[0].utilization;
        assert_eq!(utilization.usage, 60.0);
        assert_eq!(utilization.idle, 20.0);
        assert_eq!(utilization.user, 30.0);
        assert_eq!(utilization.kernel, 50.0);
        assert_eq!(utilization.kernel_busy(), 30.0);
        assert_eq!(cpu.average, utilization);
    }

    #[test]
    fn test_no_active_processors_uses_fallback_divisor() {
        let topology = ProcessorTopology {
            groups: vec![ProcessorGroup {
                maximum_processor_count: 4,
                active_processor_mask: 0,
            }],
        };
        let cpu = CpuUtilization::compute(&topology, &[ticks(10, 10, 5); 4]);

        assert!(cpu.processors.is_empty());
        for value in [cpu.average.usage, cpu.average.user, cpu.average.kernel, cpu.average.idle] {
            assert!(value.is_finite());
            assert_eq!(value, 0.0);
        }
    }

    #[test]
    fn test_zero_tick_processor_is_excluded() {
        let topology = ProcessorTopology::single_group(2);
        let cpu = CpuUtilization::compute(&topology, &[ticks(0, 0, 0), ticks(80, 20, 40)]);

        assert_eq!(cpu.processors.len(), 1);
        assert_eq!(cpu.processors[0].id, 1);
        assert_eq!(cpu.average.usage, 60.0);
        assert!(cpu.average.idle.is_finite());
    }

    #[test]
    fn test_inactive_slots_are_skipped_but_keep_their_index() {
        let topology = ProcessorTopology {
            groups: vec![
                ProcessorGroup {
                    maximum_processor_count: 3,
                    active_processor_mask: 0b101,
                },
                ProcessorGroup {
                    maximum_processor_count: 2,
                    active_processor_mask: 0b10,
                },
            ],
        };
        let counters = [
            ticks(100, 0, 50),
            ticks(1, 1, 1),
            ticks(60, 40, 0),
            ticks(1, 1, 1),
            ticks(50, 50, 100),
        ];
        let cpu = CpuUtilization::compute(&topology, &counters);

        let ids: Vec<(u32, u32)> = cpu.processors.iter().map(|p| (p.group, p.id)).collect();
        assert_eq!(ids, vec![(0, 0), (0, 2), (1, 1)]);
        // usage: 50, 100, 0
        assert_eq!(cpu.average.usage, 50.0);
        assert_eq!(cpu.average.idle, 50.0);
    }

    #[test]
    fn test_counters_covering_only_first_group() {
        let topology = ProcessorTopology {
            groups: vec![
                ProcessorGroup {
                    maximum_processor_count: 2,
                    active_processor_mask: 0b11,
                },
                ProcessorGroup {
                    maximum_processor_count: 2,
                    active_processor_mask: 0b11,
                },
            ],
        };
        let cpu = CpuUtilization::compute(&topology, &[ticks(70, 30, 10), ticks(70, 30, 30)]);

        assert_eq!(cpu.processors.len(), 2);
        assert!(cpu.processors.iter().all(|p| p.group == 0));
        assert_eq!(cpu.average.idle, 20.0);
    }

    #[test]
    fn test_single_group_mask() {
        assert_eq!(ProcessorTopology::single_group(4).groups[0].active_processor_mask, 0b1111);
        assert_eq!(ProcessorTopology::single_group(64).active_processor_count(), 64);
    }
}
