//! End-to-end tests: install metric groups into a registry, drive ticks
//! over mock and temp-dir counter sources, and assert gathered values.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use hostmetrics::rates::{get_max_io_util, get_max_net_traffic};
use hostmetrics::{MockFs, RealFs, SECTOR_SIZE, SystemMetrics};
use prometheus::Registry;

fn devices(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn interfaces(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Looks up a gathered gauge value, optionally matching a label value.
fn gauge_value(registry: &Registry, name: &str, label: Option<&str>) -> Option<f64> {
    registry
        .gather()
        .iter()
        .find(|mf| mf.get_name() == name)
        .and_then(|mf| {
            mf.get_metric()
                .iter()
                .find(|m| match label {
                    Some(value) => m.get_label().iter().any(|l| l.get_value() == value),
                    None => true,
                })
                .map(|m| m.get_gauge().get_value())
        })
}

fn history(entries: &[(&str, &[i64])]) -> BTreeMap<String, Vec<i64>> {
    entries
        .iter()
        .map(|(name, samples)| (name.to_string(), samples.to_vec()))
        .collect()
}

#[test]
fn deltas_across_ticks_for_every_category() {
    let fs = MockFs::typical_host();
    let registry = Registry::new();
    let mut metrics = SystemMetrics::new(fs.clone(), "/proc");

    metrics.install(&registry, &devices(&["sda"]), &interfaces(&["eth0"]));

    // First tick: no previous snapshots, cumulative categories report zero.
    metrics.update_with_elapsed(Duration::from_secs(1));
    assert_eq!(gauge_value(&registry, "host_cpu_ticks", Some("user")), Some(0.0));
    assert_eq!(
        gauge_value(&registry, "host_disk_read_bytes_per_second", Some("sda")),
        Some(0.0)
    );

    // Gauge categories are live from the first tick.
    assert_eq!(
        gauge_value(&registry, "host_memory_total_bytes", None),
        Some((16384000u64 * 1024) as f64)
    );
    assert_eq!(gauge_value(&registry, "host_fd_allocated", None), Some(1632.0));

    // Advance the counters and tick again.
    fs.set_cpu_ticks([10100, 500, 3050, 80850, 1000, 200, 100, 0, 0, 0]);
    fs.add_file(
        "/proc/diskstats",
        "   8       0 sda 12400 100 989702 5100 6800 50 457813 3050 1 4500 9000 0 0 0 0\n",
    );
    fs.set_net_counters("eth0", 987_754_321, 654_821, 123_656_789, 456_989);
    metrics.update_with_elapsed(Duration::from_secs(2));

    assert_eq!(gauge_value(&registry, "host_cpu_ticks", Some("user")), Some(100.0));
    assert_eq!(gauge_value(&registry, "host_cpu_ticks", Some("system")), Some(50.0));
    assert_eq!(gauge_value(&registry, "host_cpu_ticks", Some("idle")), Some(850.0));
    assert_eq!(gauge_value(&registry, "host_cpu_ticks", Some("total")), Some(1000.0));

    // 2048 sectors read over 2s.
    assert_eq!(
        gauge_value(&registry, "host_disk_read_bytes_per_second", Some("sda")),
        Some((1024 * SECTOR_SIZE) as f64)
    );
    // 1024 sectors written over 2s.
    assert_eq!(
        gauge_value(&registry, "host_disk_written_bytes_per_second", Some("sda")),
        Some((512 * SECTOR_SIZE) as f64)
    );
    // 500ms of io-time over a 2000ms tick.
    assert_eq!(gauge_value(&registry, "host_disk_util", Some("sda")), Some(0.25));
    assert_eq!(gauge_value(&registry, "host_disk_queue_depth", Some("sda")), Some(1.0));

    // 100000 rx bytes and 200000 tx bytes over 2s.
    assert_eq!(
        gauge_value(&registry, "host_network_receive_bytes_per_second", Some("eth0")),
        Some(50_000.0)
    );
    assert_eq!(
        gauge_value(&registry, "host_network_send_bytes_per_second", Some("eth0")),
        Some(100_000.0)
    );
    // 500 rx packets and 200 tx packets over 2s.
    assert_eq!(
        gauge_value(&registry, "host_network_receive_packets_per_second", Some("eth0")),
        Some(250.0)
    );
    assert_eq!(
        gauge_value(&registry, "host_network_send_packets_per_second", Some("eth0")),
        Some(100.0)
    );
}

#[test]
fn unchanged_sources_yield_zero_deltas() {
    let fs = MockFs::typical_host();
    let registry = Registry::new();
    let mut metrics = SystemMetrics::new(fs, "/proc");

    metrics.install(&registry, &devices(&["sda"]), &interfaces(&["eth0"]));
    metrics.update_with_elapsed(Duration::from_secs(1));
    metrics.update_with_elapsed(Duration::from_secs(1));

    assert_eq!(gauge_value(&registry, "host_cpu_ticks", Some("total")), Some(0.0));
    assert_eq!(
        gauge_value(&registry, "host_disk_read_bytes_per_second", Some("sda")),
        Some(0.0)
    );
    assert_eq!(
        gauge_value(&registry, "host_network_receive_bytes_per_second", Some("eth0")),
        Some(0.0)
    );
    // Gauge categories keep reporting the same instantaneous values.
    assert_eq!(
        gauge_value(&registry, "host_memory_free_bytes", None),
        Some((8192000u64 * 1024) as f64)
    );
    assert_eq!(gauge_value(&registry, "host_fd_max", None), Some(3255245.0));
}

#[test]
fn malformed_network_source_is_isolated_and_self_heals() {
    let fs = MockFs::typical_host();
    let registry = Registry::new();
    let mut metrics = SystemMetrics::new(fs.clone(), "/proc");

    metrics.install(&registry, &devices(&["sda"]), &interfaces(&["eth0"]));
    metrics.update_with_elapsed(Duration::from_secs(1));

    let frozen_rx = gauge_value(&registry, "host_network_receive_bytes", Some("eth0"));
    assert_eq!(frozen_rx, Some(987_654_321.0));

    // Tick T: truncated network line, CPU advancing normally.
    fs.set_cpu_ticks([10100, 500, 3000, 80000, 1000, 200, 100, 0, 0, 0]);
    fs.add_file(
        "/proc/net/dev",
        "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
  eth0: 990000000 654900\n",
    );
    metrics.update_with_elapsed(Duration::from_secs(1));

    // Other categories advanced; network froze at its last good values.
    assert_eq!(gauge_value(&registry, "host_cpu_ticks", Some("user")), Some(100.0));
    assert_eq!(
        gauge_value(&registry, "host_network_receive_bytes", Some("eth0")),
        frozen_rx
    );

    // Tick T+1: source is well-formed again, deltas resume against the
    // last good snapshot.
    fs.set_net_counters("eth0", 987_954_321, 655_321, 123_456_789, 456_789);
    metrics.update_with_elapsed(Duration::from_secs(1));

    assert_eq!(
        gauge_value(&registry, "host_network_receive_bytes_per_second", Some("eth0")),
        Some(300_000.0)
    );
    assert_eq!(
        gauge_value(&registry, "host_network_receive_bytes", Some("eth0")),
        Some(987_954_321.0)
    );
}

#[test]
fn network_layout_change_freezes_values() {
    let fs = MockFs::typical_host();
    let registry = Registry::new();
    let mut metrics = SystemMetrics::new(fs.clone(), "/proc");

    metrics.install(&registry, &BTreeSet::new(), &interfaces(&["eth0"]));
    metrics.update_with_elapsed(Duration::from_secs(1));

    // The source flips from the modern layout to the pre-multicast one.
    fs.add_file(
        "/proc/net/dev",
        "\
Inter-|   Receive                          |  Transmit
 face |bytes    packets errs drop fifo frame|bytes    packets errs drop fifo colls
  eth0: 999999999     9999    0    0    0     0 199999999     9999    0    0    0     0
",
    );
    metrics.update_with_elapsed(Duration::from_secs(1));

    // The differently-laid-out values were not applied.
    assert_eq!(
        gauge_value(&registry, "host_network_receive_bytes", Some("eth0")),
        Some(987_654_321.0)
    );
}

#[test]
fn vanished_device_freezes_and_other_devices_advance() {
    let fs = MockFs::typical_host();
    let registry = Registry::new();
    let mut metrics = SystemMetrics::new(fs.clone(), "/proc");

    metrics.install(&registry, &devices(&["sda", "nvme0n1"]), &[]);
    metrics.update_with_elapsed(Duration::from_secs(1));

    assert_eq!(gauge_value(&registry, "host_disk_io_time_ms", Some("sda")), Some(4000.0));
    assert_eq!(
        gauge_value(&registry, "host_disk_io_time_ms", Some("nvme0n1")),
        Some(15000.0)
    );

    // sda hot-removed; nvme0n1 keeps counting.
    fs.add_file(
        "/proc/diskstats",
        " 259       0 nvme0n1 50000 200 2000000 10000 30000 150 1500000 8000 5 16000 19000 0 0 0 0\n",
    );
    metrics.update_with_elapsed(Duration::from_secs(1));

    assert_eq!(gauge_value(&registry, "host_disk_io_time_ms", Some("sda")), Some(4000.0));
    assert_eq!(
        gauge_value(&registry, "host_disk_io_time_ms", Some("nvme0n1")),
        Some(16000.0)
    );
    assert_eq!(gauge_value(&registry, "host_disk_util", Some("nvme0n1")), Some(1.0));

    // The frozen device still reports its last cumulative counters.
    let io_time = metrics.get_disks_io_time();
    assert_eq!(io_time["sda"], 4000);
    assert_eq!(io_time["nvme0n1"], 16000);
}

#[test]
fn history_reductions_match_documented_scenarios() {
    // Device "sda" with io-time samples [1000, 1500, 1800] at 1s spacing:
    // the worst adjacent pair spends 500ms of each 1000ms interval in I/O.
    let io = history(&[("sda", &[1000, 1500, 1800])]);
    assert_eq!(get_max_io_util(&io, 1), 50);

    // Interface "eth0" send-byte samples [0, 1_000_000, 1_200_000] at 2s
    // spacing: the first interval dominates at 500_000 B/s.
    let send = history(&[("eth0", &[0, 1_000_000, 1_200_000])]);
    let rcv = history(&[("eth0", &[0, 1_000_000, 1_200_000])]);
    let (send_rate, rcv_rate) = get_max_net_traffic(&send, &rcv, 2);
    assert_eq!(send_rate, 500_000);
    assert_eq!(rcv_rate, send_rate);
}

#[test]
fn accessor_output_feeds_history_reductions() {
    let fs = MockFs::typical_host();
    let registry = Registry::new();
    let mut metrics = SystemMetrics::new(fs.clone(), "/proc");

    metrics.install(&registry, &devices(&["sda"]), &[]);
    metrics.update_with_elapsed(Duration::from_secs(1));

    let mut samples: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for (device, ms) in metrics.get_disks_io_time() {
        samples.entry(device).or_default().push(ms);
    }

    fs.set_disk_counters("sda", 20000, 1000000, 10000, 500000, 0, 4800);
    metrics.update_with_elapsed(Duration::from_secs(1));
    for (device, ms) in metrics.get_disks_io_time() {
        samples.entry(device).or_default().push(ms);
    }

    // 800ms of io-time over one 1s interval.
    assert_eq!(get_max_io_util(&samples, 1), 80);
}

#[test]
fn real_fs_end_to_end_over_temp_proc_tree() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("sys/fs")).unwrap();
    std::fs::create_dir_all(root.join("net")).unwrap();

    std::fs::write(root.join("stat"), "cpu  100 0 50 850 0 0 0 0 0 0\n").unwrap();
    std::fs::write(
        root.join("meminfo"),
        "MemTotal: 1024 kB\nMemFree: 512 kB\nMemAvailable: 768 kB\n",
    )
    .unwrap();
    std::fs::write(
        root.join("diskstats"),
        "   8       0 vda 10 0 200 5 20 0 400 10 0 15 30 0 0 0 0\n",
    )
    .unwrap();
    std::fs::write(
        root.join("net/dev"),
        "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
  eth0: 1000 10 0 0 0 0 0 0 2000 20 0 0 0 0 0 0
",
    )
    .unwrap();
    std::fs::write(root.join("sys/fs/file-nr"), "64 0 1024\n").unwrap();

    let registry = Registry::new();
    let mut metrics = SystemMetrics::new(RealFs::new(), root.to_string_lossy().into_owned());
    metrics.install(&registry, &devices(&["vda"]), &interfaces(&["eth0"]));
    metrics.update_with_elapsed(Duration::from_secs(1));

    assert_eq!(
        gauge_value(&registry, "host_memory_total_bytes", None),
        Some(1024.0 * 1024.0)
    );
    assert_eq!(gauge_value(&registry, "host_fd_max", None), Some(1024.0));
    assert_eq!(gauge_value(&registry, "host_disk_io_time_ms", Some("vda")), Some(15.0));
    assert_eq!(
        gauge_value(&registry, "host_network_send_bytes", Some("eth0")),
        Some(2000.0)
    );

    // Advance the counters on disk and verify deltas flow end to end.
    std::fs::write(root.join("stat"), "cpu  200 0 80 1720 0 0 0 0 0 0\n").unwrap();
    metrics.update_with_elapsed(Duration::from_secs(1));
    assert_eq!(gauge_value(&registry, "host_cpu_ticks", Some("user")), Some(100.0));
    assert_eq!(gauge_value(&registry, "host_cpu_ticks", Some("system")), Some(30.0));
}
