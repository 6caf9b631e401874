//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic counter-source states. Tests that need
//! counters to advance between ticks overwrite individual files through
//! their `MockFs` handle.

use super::filesystem::MockFs;

impl MockFs {
    /// Creates a typical idle host: four CPUs, two disks plus a partition,
    /// loopback and one ethernet interface.
    pub fn typical_host() -> Self {
        let fs = Self::new();

        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
",
        );

        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
Active:          4096000 kB
Inactive:        2048000 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
Dirty:              1024 kB
Writeback:             0 kB
Slab:             512000 kB
SReclaimable:     256000 kB
",
        );

        fs.add_file(
            "/proc/diskstats",
            "\
   8       0 sda 12345 100 987654 5000 6789 50 456789 3000 0 4000 8000 0 0 0 0
   8       1 sda1 10000 80 800000 4000 5000 40 400000 2500 0 3500 6500 0 0 0 0
 259       0 nvme0n1 50000 200 2000000 10000 30000 150 1500000 8000 5 15000 18000 0 0 0 0
",
        );

        fs.add_file(
            "/proc/net/dev",
            "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 12345678     9876    0    0    0     0          0         0 12345678     9876    0    0    0     0       0          0
  eth0: 987654321   654321    5   10    0     0          0       100 123456789   456789    2    5    0     0       0          0
",
        );

        fs.add_file("/proc/sys/fs/file-nr", "1632\t0\t3255245\n");

        fs
    }

    /// Replaces `/proc/stat` with new aggregate CPU buckets, leaving the
    /// other stat lines in place.
    pub fn set_cpu_ticks(&self, buckets: [u64; 10]) {
        let [user, nice, system, idle, iowait, irq, softirq, steal, guest, guest_nice] = buckets;
        self.add_file(
            "/proc/stat",
            format!(
                "cpu  {user} {nice} {system} {idle} {iowait} {irq} {softirq} {steal} {guest} {guest_nice}\n\
                 ctxt 500000\nbtime 1700000000\n"
            ),
        );
    }

    /// Replaces a single-device `/proc/diskstats` for delta-driven tests.
    #[allow(clippy::too_many_arguments)]
    pub fn set_disk_counters(
        &self,
        device: &str,
        reads: u64,
        sectors_read: u64,
        writes: u64,
        sectors_written: u64,
        io_in_progress: u64,
        io_time_ms: u64,
    ) {
        self.add_file(
            "/proc/diskstats",
            format!(
                "   8       0 {device} {reads} 0 {sectors_read} 100 {writes} 0 {sectors_written} 200 {io_in_progress} {io_time_ms} {io}\n",
                io = io_time_ms * 2
            ),
        );
    }

    /// Replaces a single-interface `/proc/net/dev` (modern layout) for
    /// delta-driven tests.
    pub fn set_net_counters(
        &self,
        interface: &str,
        rx_bytes: u64,
        rx_packets: u64,
        tx_bytes: u64,
        tx_packets: u64,
    ) {
        self.add_file(
            "/proc/net/dev",
            format!(
                "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
{interface}: {rx_bytes} {rx_packets} 0 0 0 0 0 0 {tx_bytes} {tx_packets} 0 0 0 0 0 0
"
            ),
        );
    }
}
