//! Host metric groups and the manager that drives them.
//!
//! [`SystemMetrics`] owns one metric group per resource category, binds
//! them to a `prometheus::Registry` at install time, and advances them
//! once per external tick. Each category is isolated: a failing counter
//! source skips only its own group for that tick and the affected gauges
//! freeze at their last values.

mod cpu;
mod disk;
mod fd;
mod memory;
mod net;

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use prometheus::Registry;
use tracing::{debug, info, warn};

use crate::collector::procfs::{CollectError, NetDevFormat, ProcReader};
use crate::collector::traits::FileSystem;
use cpu::CpuMetrics;
use disk::{DiskMetricFamilies, DiskMetrics};
use fd::FileDescriptorMetrics;
use memory::MemoryMetrics;
use net::{NetMetricFamilies, NetMetrics};

pub use disk::SECTOR_SIZE;

/// Name under which a host process registers the periodic [`SystemMetrics::update`]
/// callback with its scheduler.
pub const UPDATE_HOOK_NAME: &str = "hostmetrics.update";

/// Throttles per-category failure logging: one warning per failure
/// streak, one recovery note when the source heals.
#[derive(Default)]
struct FaultGate {
    failing: bool,
}

impl FaultGate {
    fn failure(&mut self, source: &str, err: &CollectError) {
        if self.failing {
            debug!(source, error = %err, "counter source still failing");
        } else {
            warn!(source, error = %err, "counter source failed, keeping last values");
            self.failing = true;
        }
    }

    fn success(&mut self, source: &str) {
        if self.failing {
            info!(source, "counter source recovered");
            self.failing = false;
        }
    }
}

/// Manager for all host resource metric groups.
///
/// Single-writer: `update` is expected to be invoked periodically from
/// one thread by an external scheduler. The registry may be scraped
/// concurrently; every gauge write is a single atomic store.
pub struct SystemMetrics<F: FileSystem> {
    reader: ProcReader<F>,
    installed: bool,
    cpu: Option<CpuMetrics>,
    cpu_gate: FaultGate,
    memory: Option<MemoryMetrics>,
    memory_gate: FaultGate,
    disks: BTreeMap<String, DiskMetrics>,
    disk_gate: FaultGate,
    nets: BTreeMap<String, NetMetrics>,
    net_gate: FaultGate,
    net_format: Option<NetDevFormat>,
    fd: Option<FileDescriptorMetrics>,
    fd_gate: FaultGate,
    last_tick: Option<Instant>,
}

impl<F: FileSystem> SystemMetrics<F> {
    /// Creates a manager. Nothing is registered until [`install`](Self::install).
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            reader: ProcReader::new(fs, proc_path),
            installed: false,
            cpu: None,
            cpu_gate: FaultGate::default(),
            memory: None,
            memory_gate: FaultGate::default(),
            disks: BTreeMap::new(),
            disk_gate: FaultGate::default(),
            nets: BTreeMap::new(),
            net_gate: FaultGate::default(),
            net_format: None,
            fd: None,
            fd_gate: FaultGate::default(),
            last_tick: None,
        }
    }

    /// Binds metric groups to `registry`, tracking exactly the given disk
    /// devices and network interfaces. Idempotent; call once at startup.
    ///
    /// Each category probes its counter source first. An unreadable
    /// source or a registry rejection (duplicate name) leaves only that
    /// category uninstalled; the others still install. Entities outside
    /// the configured sets are never tracked, and the sets are fixed for
    /// the manager's lifetime.
    pub fn install(
        &mut self,
        registry: &Registry,
        disk_devices: &BTreeSet<String>,
        network_interfaces: &[String],
    ) {
        if self.installed {
            return;
        }
        self.installed = true;

        match self.reader.collect_cpu() {
            Ok(_) => match CpuMetrics::install(registry) {
                Ok(m) => self.cpu = Some(m),
                Err(err) => warn!(error = %err, "registry rejected cpu metrics"),
            },
            Err(err) => warn!(error = %err, "cpu counter source unavailable, cpu metrics not installed"),
        }

        match self.reader.collect_meminfo() {
            Ok(_) => match MemoryMetrics::install(registry) {
                Ok(m) => self.memory = Some(m),
                Err(err) => warn!(error = %err, "registry rejected memory metrics"),
            },
            Err(err) => warn!(error = %err, "memory counter source unavailable, memory metrics not installed"),
        }

        if !disk_devices.is_empty() {
            match self.reader.collect_diskstats() {
                Ok(_) => match DiskMetricFamilies::install(registry) {
                    Ok(families) => {
                        for device in disk_devices {
                            self.disks
                                .insert(device.clone(), DiskMetrics::new(&families, device));
                        }
                    }
                    Err(err) => warn!(error = %err, "registry rejected disk metrics"),
                },
                Err(err) => warn!(error = %err, "disk counter source unavailable, disk metrics not installed"),
            }
        }

        if !network_interfaces.is_empty() {
            match self.reader.collect_net_dev() {
                Ok((format, _)) => match NetMetricFamilies::install(registry) {
                    Ok(families) => {
                        self.net_format = Some(format);
                        for interface in network_interfaces {
                            self.nets
                                .insert(interface.clone(), NetMetrics::new(&families, interface));
                        }
                    }
                    Err(err) => warn!(error = %err, "registry rejected network metrics"),
                },
                Err(err) => warn!(error = %err, "network counter source unavailable, network metrics not installed"),
            }
        }

        match self.reader.collect_file_nr() {
            Ok(_) => match FileDescriptorMetrics::install(registry) {
                Ok(m) => self.fd = Some(m),
                Err(err) => warn!(error = %err, "registry rejected fd metrics"),
            },
            Err(err) => warn!(error = %err, "fd counter source unavailable, fd metrics not installed"),
        }
    }

    /// Runs one sampling tick, measuring elapsed time since the previous
    /// call. Never fails: each category's errors are logged and isolated,
    /// and the affected gauges keep their last values until the next good
    /// tick.
    pub fn update(&mut self) {
        let now = Instant::now();
        let elapsed = self
            .last_tick
            .map(|prev| now.duration_since(prev))
            .unwrap_or(Duration::ZERO);
        self.last_tick = Some(now);
        self.update_with_elapsed(elapsed);
    }

    /// Runs one sampling tick with a caller-supplied tick duration.
    ///
    /// Useful when the scheduler knows the exact interval; [`update`](Self::update)
    /// delegates here with measured wall-clock time. Categories run in a
    /// fixed order (cpu, memory, disk, network, fd) for deterministic
    /// diagnostics.
    pub fn update_with_elapsed(&mut self, elapsed: Duration) {
        if let Some(cpu) = &mut self.cpu {
            match self.reader.collect_cpu() {
                Ok(stat) => {
                    self.cpu_gate.success("/proc/stat");
                    if cpu.update(stat) {
                        debug!("cpu counter reset, reporting zero deltas this tick");
                    }
                }
                Err(err) => self.cpu_gate.failure("/proc/stat", &err),
            }
        }

        if let Some(memory) = &self.memory {
            match self.reader.collect_meminfo() {
                Ok(info) => {
                    self.memory_gate.success("/proc/meminfo");
                    memory.update(&info);
                }
                Err(err) => self.memory_gate.failure("/proc/meminfo", &err),
            }
        }

        if !self.disks.is_empty() {
            match self.reader.collect_diskstats() {
                Ok(stats) => {
                    self.disk_gate.success("/proc/diskstats");
                    let mut reset = false;
                    for curr in &stats {
                        // Devices outside the configured set are skipped;
                        // configured devices absent from the source freeze.
                        if let Some(disk) = self.disks.get_mut(&curr.device) {
                            reset |= disk.update(curr, elapsed);
                        }
                    }
                    if reset {
                        debug!("disk counter reset, reporting zero deltas this tick");
                    }
                }
                Err(err) => self.disk_gate.failure("/proc/diskstats", &err),
            }
        }

        if !self.nets.is_empty() {
            match self.reader.collect_net_dev() {
                Ok((format, stats)) => match self.net_format {
                    Some(expected) if expected != format => {
                        let err = CollectError::FormatChanged {
                            expected,
                            detected: format,
                        };
                        self.net_gate.failure("/proc/net/dev", &err);
                    }
                    _ => {
                        self.net_format.get_or_insert(format);
                        self.net_gate.success("/proc/net/dev");
                        let mut reset = false;
                        for curr in &stats {
                            if let Some(net) = self.nets.get_mut(&curr.interface) {
                                reset |= net.update(curr, elapsed);
                            }
                        }
                        if reset {
                            debug!("network counter reset, reporting zero deltas this tick");
                        }
                    }
                },
                Err(err) => self.net_gate.failure("/proc/net/dev", &err),
            }
        }

        if let Some(fd) = &self.fd {
            match self.reader.collect_file_nr() {
                Ok(file_nr) => {
                    self.fd_gate.success("/proc/sys/fs/file-nr");
                    fd.update(&file_nr);
                }
                Err(err) => self.fd_gate.failure("/proc/sys/fs/file-nr", &err),
            }
        }
    }

    /// Latest cumulative io-time in ms per configured device. Devices
    /// that have not completed an update yet are absent.
    pub fn get_disks_io_time(&self) -> BTreeMap<String, i64> {
        self.disks
            .iter()
            .filter_map(|(device, disk)| {
                disk.last_io_time_ms().map(|ms| (device.clone(), ms))
            })
            .collect()
    }

    /// Latest cumulative (send, receive) byte counters per configured
    /// interface. Interfaces that have not completed an update yet are
    /// absent.
    pub fn get_network_traffic(&self) -> (BTreeMap<String, i64>, BTreeMap<String, i64>) {
        let mut send = BTreeMap::new();
        let mut rcv = BTreeMap::new();
        for (interface, net) in &self.nets {
            if let Some((tx, rx)) = net.last_bytes() {
                send.insert(interface.clone(), tx);
                rcv.insert(interface.clone(), rx);
            }
        }
        (send, rcv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    fn devices(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn interfaces(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn family_names(registry: &Registry) -> Vec<String> {
        registry
            .gather()
            .iter()
            .map(|mf| mf.get_name().to_string())
            .collect()
    }

    #[test]
    fn test_install_empty_sets_yields_no_disk_or_net_metrics() {
        let fs = MockFs::typical_host();
        let registry = Registry::new();
        let mut metrics = SystemMetrics::new(fs, "/proc");

        metrics.install(&registry, &BTreeSet::new(), &[]);
        metrics.update_with_elapsed(Duration::from_secs(1));

        let names = family_names(&registry);
        assert!(names.iter().any(|n| n == "host_cpu_ticks"));
        assert!(names.iter().any(|n| n == "host_memory_total_bytes"));
        assert!(names.iter().any(|n| n == "host_fd_allocated"));
        assert!(!names.iter().any(|n| n.starts_with("host_disk_")));
        assert!(!names.iter().any(|n| n.starts_with("host_network_")));
    }

    #[test]
    fn test_install_is_idempotent() {
        let fs = MockFs::typical_host();
        let registry = Registry::new();
        let mut metrics = SystemMetrics::new(fs, "/proc");

        metrics.install(&registry, &devices(&["sda"]), &interfaces(&["eth0"]));
        metrics.install(&registry, &devices(&["sda"]), &interfaces(&["eth0"]));

        // Second call is a no-op; the registry accepted each family once.
        assert_eq!(metrics.disks.len(), 1);
        assert_eq!(metrics.nets.len(), 1);
    }

    #[test]
    fn test_unavailable_source_skips_only_that_category() {
        let fs = MockFs::typical_host();
        fs.remove_file("/proc/diskstats");

        let registry = Registry::new();
        let mut metrics = SystemMetrics::new(fs, "/proc");
        metrics.install(&registry, &devices(&["sda"]), &interfaces(&["eth0"]));

        let names = family_names(&registry);
        assert!(!names.iter().any(|n| n.starts_with("host_disk_")));
        assert!(names.iter().any(|n| n == "host_cpu_ticks"));
        assert!(names.iter().any(|n| n.starts_with("host_network_")));
    }

    #[test]
    fn test_unconfigured_entities_are_not_tracked() {
        let fs = MockFs::typical_host();
        let registry = Registry::new();
        let mut metrics = SystemMetrics::new(fs, "/proc");

        metrics.install(&registry, &devices(&["sda"]), &interfaces(&["eth0"]));
        metrics.update_with_elapsed(Duration::from_secs(1));

        let (send, _) = metrics.get_network_traffic();
        assert!(send.contains_key("eth0"));
        assert!(!send.contains_key("lo"));

        let io_time = metrics.get_disks_io_time();
        assert!(io_time.contains_key("sda"));
        assert!(!io_time.contains_key("nvme0n1"));
    }

    #[test]
    fn test_accessors_empty_before_first_update() {
        let fs = MockFs::typical_host();
        let registry = Registry::new();
        let mut metrics = SystemMetrics::new(fs, "/proc");

        metrics.install(&registry, &devices(&["sda"]), &interfaces(&["eth0"]));

        assert!(metrics.get_disks_io_time().is_empty());
        let (send, rcv) = metrics.get_network_traffic();
        assert!(send.is_empty());
        assert!(rcv.is_empty());
    }

    #[test]
    fn test_cumulative_accessors_track_latest_sample() {
        let fs = MockFs::typical_host();
        let registry = Registry::new();
        let mut metrics = SystemMetrics::new(fs.clone(), "/proc");

        metrics.install(&registry, &devices(&["sda"]), &interfaces(&["eth0"]));
        metrics.update_with_elapsed(Duration::from_secs(1));

        assert_eq!(metrics.get_disks_io_time()["sda"], 4000);
        let (send, rcv) = metrics.get_network_traffic();
        assert_eq!(send["eth0"], 123456789);
        assert_eq!(rcv["eth0"], 987654321);

        fs.set_disk_counters("sda", 20000, 1000000, 10000, 500000, 0, 4500);
        metrics.update_with_elapsed(Duration::from_secs(1));
        assert_eq!(metrics.get_disks_io_time()["sda"], 4500);
    }
}
