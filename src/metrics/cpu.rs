//! CPU metric group: per-mode jiffy deltas from the aggregate cpu line.

use prometheus::{IntGauge, IntGaugeVec, Opts, Registry};

use crate::collector::procfs::CpuStat;
use crate::rates::delta_or_reset;

/// Mode label values, parallel to [`CpuStat::buckets`].
const MODES: [&str; 10] = [
    "user",
    "nice",
    "system",
    "idle",
    "iowait",
    "irq",
    "softirq",
    "steal",
    "guest",
    "guest_nice",
];

/// Gauges for CPU time spent per mode during the last tick, plus a
/// derived `total` pseudo mode summing all buckets.
pub(crate) struct CpuMetrics {
    ticks: Vec<IntGauge>,
    total: IntGauge,
    prev: Option<CpuStat>,
}

impl CpuMetrics {
    /// Registers the CPU gauge family and resolves one handle per mode.
    pub fn install(registry: &Registry) -> Result<Self, prometheus::Error> {
        let family = IntGaugeVec::new(
            Opts::new(
                "host_cpu_ticks",
                "CPU time spent per mode during the last tick (jiffies)",
            ),
            &["mode"],
        )?;
        registry.register(Box::new(family.clone()))?;

        Ok(Self {
            ticks: MODES
                .iter()
                .map(|&mode| family.with_label_values(&[mode]))
                .collect(),
            total: family.with_label_values(&["total"]),
            prev: None,
        })
    }

    /// Writes per-mode deltas against the previous snapshot.
    ///
    /// The first tick after install reports zero for every mode. Returns
    /// true if any bucket regressed (counter reset), in which case the
    /// affected deltas are reported as zero.
    pub fn update(&mut self, curr: CpuStat) -> bool {
        let mut reset = false;

        match &self.prev {
            Some(prev) => {
                let curr_buckets = curr.buckets();
                let prev_buckets = prev.buckets();
                let mut total = 0;
                for (i, gauge) in self.ticks.iter().enumerate() {
                    let delta = delta_or_reset(curr_buckets[i], prev_buckets[i], &mut reset);
                    gauge.set(delta as i64);
                    total += delta;
                }
                self.total.set(total as i64);
            }
            None => {
                for gauge in &self.ticks {
                    gauge.set(0);
                }
                self.total.set(0);
            }
        }

        self.prev = Some(curr);
        reset
    }
}
