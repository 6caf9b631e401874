//! Disk metric group: per-device rates derived from cumulative counters.

use std::time::Duration;

use prometheus::{Gauge, GaugeVec, IntGauge, IntGaugeVec, Opts, Registry};

use crate::collector::procfs::DiskStats;
use crate::rates::delta_or_reset;

/// Bytes per sector as reported by the kernel's I/O statistics. The
/// counters are always in 512-byte units regardless of the device's
/// physical sector size.
pub const SECTOR_SIZE: u64 = 512;

/// Gauge families shared by all configured devices, registered once.
pub(crate) struct DiskMetricFamilies {
    read_bytes_rate: IntGaugeVec,
    written_bytes_rate: IntGaugeVec,
    util: GaugeVec,
    queue_depth: IntGaugeVec,
    reads_completed: IntGaugeVec,
    writes_completed: IntGaugeVec,
    bytes_read: IntGaugeVec,
    bytes_written: IntGaugeVec,
    read_time_ms: IntGaugeVec,
    write_time_ms: IntGaugeVec,
    io_time_ms: IntGaugeVec,
    io_time_weighted_ms: IntGaugeVec,
}

fn family(
    registry: &Registry,
    name: &str,
    help: &str,
) -> Result<IntGaugeVec, prometheus::Error> {
    let vec = IntGaugeVec::new(Opts::new(name, help), &["device"])?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}

impl DiskMetricFamilies {
    pub fn install(registry: &Registry) -> Result<Self, prometheus::Error> {
        let util = GaugeVec::new(
            Opts::new(
                "host_disk_util",
                "Fraction of the last tick spent with at least one I/O outstanding",
            ),
            &["device"],
        )?;
        registry.register(Box::new(util.clone()))?;

        Ok(Self {
            read_bytes_rate: family(
                registry,
                "host_disk_read_bytes_per_second",
                "Read throughput over the last tick",
            )?,
            written_bytes_rate: family(
                registry,
                "host_disk_written_bytes_per_second",
                "Write throughput over the last tick",
            )?,
            util,
            queue_depth: family(
                registry,
                "host_disk_queue_depth",
                "I/O operations currently in progress",
            )?,
            reads_completed: family(
                registry,
                "host_disk_reads_completed",
                "Cumulative reads completed",
            )?,
            writes_completed: family(
                registry,
                "host_disk_writes_completed",
                "Cumulative writes completed",
            )?,
            bytes_read: family(registry, "host_disk_bytes_read", "Cumulative bytes read")?,
            bytes_written: family(
                registry,
                "host_disk_bytes_written",
                "Cumulative bytes written",
            )?,
            read_time_ms: family(
                registry,
                "host_disk_read_time_ms",
                "Cumulative time spent reading",
            )?,
            write_time_ms: family(
                registry,
                "host_disk_write_time_ms",
                "Cumulative time spent writing",
            )?,
            io_time_ms: family(
                registry,
                "host_disk_io_time_ms",
                "Cumulative time with at least one I/O outstanding",
            )?,
            io_time_weighted_ms: family(
                registry,
                "host_disk_io_time_weighted_ms",
                "Cumulative weighted I/O time",
            )?,
        })
    }
}

/// Per-device gauge handles plus the previous counter snapshot.
pub(crate) struct DiskMetrics {
    read_bytes_rate: IntGauge,
    written_bytes_rate: IntGauge,
    util: Gauge,
    queue_depth: IntGauge,
    reads_completed: IntGauge,
    writes_completed: IntGauge,
    bytes_read: IntGauge,
    bytes_written: IntGauge,
    read_time_ms: IntGauge,
    write_time_ms: IntGauge,
    io_time_ms: IntGauge,
    io_time_weighted_ms: IntGauge,
    prev: Option<DiskStats>,
}

impl DiskMetrics {
    pub fn new(families: &DiskMetricFamilies, device: &str) -> Self {
        let labels = &[device];
        Self {
            read_bytes_rate: families.read_bytes_rate.with_label_values(labels),
            written_bytes_rate: families.written_bytes_rate.with_label_values(labels),
            util: families.util.with_label_values(labels),
            queue_depth: families.queue_depth.with_label_values(labels),
            reads_completed: families.reads_completed.with_label_values(labels),
            writes_completed: families.writes_completed.with_label_values(labels),
            bytes_read: families.bytes_read.with_label_values(labels),
            bytes_written: families.bytes_written.with_label_values(labels),
            read_time_ms: families.read_time_ms.with_label_values(labels),
            write_time_ms: families.write_time_ms.with_label_values(labels),
            io_time_ms: families.io_time_ms.with_label_values(labels),
            io_time_weighted_ms: families.io_time_weighted_ms.with_label_values(labels),
            prev: None,
        }
    }

    /// Latest cumulative io-time in ms, if at least one update has run.
    pub fn last_io_time_ms(&self) -> Option<i64> {
        self.prev.as_ref().map(|p| p.io_time_ms as i64)
    }

    /// Diffs against the previous snapshot and writes rates plus raw
    /// cumulative mirrors. Returns true if any counter regressed.
    pub fn update(&mut self, curr: &DiskStats, elapsed: Duration) -> bool {
        let mut reset = false;

        if let Some(prev) = &self.prev {
            let sectors_read = delta_or_reset(curr.sectors_read, prev.sectors_read, &mut reset);
            let sectors_written =
                delta_or_reset(curr.sectors_written, prev.sectors_written, &mut reset);
            let io_time = delta_or_reset(curr.io_time_ms, prev.io_time_ms, &mut reset);

            let secs = elapsed.as_secs_f64();
            if secs > 0.0 {
                self.read_bytes_rate
                    .set(((sectors_read * SECTOR_SIZE) as f64 / secs) as i64);
                self.written_bytes_rate
                    .set(((sectors_written * SECTOR_SIZE) as f64 / secs) as i64);
                self.util
                    .set((io_time as f64 / (secs * 1000.0)).clamp(0.0, 1.0));
            } else {
                self.read_bytes_rate.set(0);
                self.written_bytes_rate.set(0);
                self.util.set(0.0);
            }
        } else {
            self.read_bytes_rate.set(0);
            self.written_bytes_rate.set(0);
            self.util.set(0.0);
        }

        self.queue_depth.set(curr.io_in_progress as i64);
        self.reads_completed.set(curr.reads_completed as i64);
        self.writes_completed.set(curr.writes_completed as i64);
        self.bytes_read
            .set((curr.sectors_read * SECTOR_SIZE) as i64);
        self.bytes_written
            .set((curr.sectors_written * SECTOR_SIZE) as i64);
        self.read_time_ms.set(curr.read_time_ms as i64);
        self.write_time_ms.set(curr.write_time_ms as i64);
        self.io_time_ms.set(curr.io_time_ms as i64);
        self.io_time_weighted_ms
            .set(curr.io_time_weighted_ms as i64);

        self.prev = Some(curr.clone());
        reset
    }
}
