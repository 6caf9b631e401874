//! Network metric group: per-interface rates derived from cumulative
//! counters.

use std::time::Duration;

use prometheus::{IntGauge, IntGaugeVec, Opts, Registry};

use crate::collector::procfs::NetDevStats;
use crate::rates::delta_or_reset;

/// Gauge families shared by all configured interfaces, registered once.
pub(crate) struct NetMetricFamilies {
    receive_bytes_rate: IntGaugeVec,
    send_bytes_rate: IntGaugeVec,
    receive_packets_rate: IntGaugeVec,
    send_packets_rate: IntGaugeVec,
    receive_bytes: IntGaugeVec,
    send_bytes: IntGaugeVec,
    receive_packets: IntGaugeVec,
    send_packets: IntGaugeVec,
    receive_errors: IntGaugeVec,
    send_errors: IntGaugeVec,
    receive_dropped: IntGaugeVec,
    send_dropped: IntGaugeVec,
}

fn family(
    registry: &Registry,
    name: &str,
    help: &str,
) -> Result<IntGaugeVec, prometheus::Error> {
    let vec = IntGaugeVec::new(Opts::new(name, help), &["interface"])?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}

impl NetMetricFamilies {
    pub fn install(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            receive_bytes_rate: family(
                registry,
                "host_network_receive_bytes_per_second",
                "Receive throughput over the last tick",
            )?,
            send_bytes_rate: family(
                registry,
                "host_network_send_bytes_per_second",
                "Send throughput over the last tick",
            )?,
            receive_packets_rate: family(
                registry,
                "host_network_receive_packets_per_second",
                "Receive packet rate over the last tick",
            )?,
            send_packets_rate: family(
                registry,
                "host_network_send_packets_per_second",
                "Send packet rate over the last tick",
            )?,
            receive_bytes: family(
                registry,
                "host_network_receive_bytes",
                "Cumulative bytes received",
            )?,
            send_bytes: family(registry, "host_network_send_bytes", "Cumulative bytes sent")?,
            receive_packets: family(
                registry,
                "host_network_receive_packets",
                "Cumulative packets received",
            )?,
            send_packets: family(
                registry,
                "host_network_send_packets",
                "Cumulative packets sent",
            )?,
            receive_errors: family(
                registry,
                "host_network_receive_errors",
                "Cumulative receive errors",
            )?,
            send_errors: family(
                registry,
                "host_network_send_errors",
                "Cumulative send errors",
            )?,
            receive_dropped: family(
                registry,
                "host_network_receive_dropped",
                "Cumulative inbound packets dropped",
            )?,
            send_dropped: family(
                registry,
                "host_network_send_dropped",
                "Cumulative outbound packets dropped",
            )?,
        })
    }
}

/// Per-interface gauge handles plus the previous counter snapshot.
pub(crate) struct NetMetrics {
    receive_bytes_rate: IntGauge,
    send_bytes_rate: IntGauge,
    receive_packets_rate: IntGauge,
    send_packets_rate: IntGauge,
    receive_bytes: IntGauge,
    send_bytes: IntGauge,
    receive_packets: IntGauge,
    send_packets: IntGauge,
    receive_errors: IntGauge,
    send_errors: IntGauge,
    receive_dropped: IntGauge,
    send_dropped: IntGauge,
    prev: Option<NetDevStats>,
}

impl NetMetrics {
    pub fn new(families: &NetMetricFamilies, interface: &str) -> Self {
        let labels = &[interface];
        Self {
            receive_bytes_rate: families.receive_bytes_rate.with_label_values(labels),
            send_bytes_rate: families.send_bytes_rate.with_label_values(labels),
            receive_packets_rate: families.receive_packets_rate.with_label_values(labels),
            send_packets_rate: families.send_packets_rate.with_label_values(labels),
            receive_bytes: families.receive_bytes.with_label_values(labels),
            send_bytes: families.send_bytes.with_label_values(labels),
            receive_packets: families.receive_packets.with_label_values(labels),
            send_packets: families.send_packets.with_label_values(labels),
            receive_errors: families.receive_errors.with_label_values(labels),
            send_errors: families.send_errors.with_label_values(labels),
            receive_dropped: families.receive_dropped.with_label_values(labels),
            send_dropped: families.send_dropped.with_label_values(labels),
            prev: None,
        }
    }

    /// Latest cumulative (send, receive) byte counters, if at least one
    /// update has run.
    pub fn last_bytes(&self) -> Option<(i64, i64)> {
        self.prev
            .as_ref()
            .map(|p| (p.tx_bytes as i64, p.rx_bytes as i64))
    }

    /// Diffs against the previous snapshot and writes rates plus raw
    /// cumulative mirrors. Returns true if any counter regressed.
    pub fn update(&mut self, curr: &NetDevStats, elapsed: Duration) -> bool {
        let mut reset = false;

        if let Some(prev) = &self.prev {
            let rx_bytes = delta_or_reset(curr.rx_bytes, prev.rx_bytes, &mut reset);
            let tx_bytes = delta_or_reset(curr.tx_bytes, prev.tx_bytes, &mut reset);
            let rx_packets = delta_or_reset(curr.rx_packets, prev.rx_packets, &mut reset);
            let tx_packets = delta_or_reset(curr.tx_packets, prev.tx_packets, &mut reset);

            let secs = elapsed.as_secs_f64();
            if secs > 0.0 {
                self.receive_bytes_rate.set((rx_bytes as f64 / secs) as i64);
                self.send_bytes_rate.set((tx_bytes as f64 / secs) as i64);
                self.receive_packets_rate
                    .set((rx_packets as f64 / secs) as i64);
                self.send_packets_rate.set((tx_packets as f64 / secs) as i64);
            } else {
                self.receive_bytes_rate.set(0);
                self.send_bytes_rate.set(0);
                self.receive_packets_rate.set(0);
                self.send_packets_rate.set(0);
            }
        } else {
            self.receive_bytes_rate.set(0);
            self.send_bytes_rate.set(0);
            self.receive_packets_rate.set(0);
            self.send_packets_rate.set(0);
        }

        self.receive_bytes.set(curr.rx_bytes as i64);
        self.send_bytes.set(curr.tx_bytes as i64);
        self.receive_packets.set(curr.rx_packets as i64);
        self.send_packets.set(curr.tx_packets as i64);
        self.receive_errors.set(curr.rx_errs as i64);
        self.send_errors.set(curr.tx_errs as i64);
        self.receive_dropped.set(curr.rx_drop as i64);
        self.send_dropped.set(curr.tx_drop as i64);

        self.prev = Some(curr.clone());
        reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface_value(registry: &Registry, name: &str, interface: &str) -> i64 {
        registry
            .gather()
            .iter()
            .find(|mf| mf.get_name() == name)
            .and_then(|mf| {
                mf.get_metric()
                    .iter()
                    .find(|m| m.get_label().iter().any(|l| l.get_value() == interface))
                    .map(|m| m.get_gauge().get_value() as i64)
            })
            .expect("interface gauge not found")
    }

    fn stats(interface: &str, rx_bytes: u64, tx_bytes: u64) -> NetDevStats {
        NetDevStats {
            interface: interface.to_string(),
            rx_bytes,
            tx_bytes,
            ..NetDevStats::default()
        }
    }

    #[test]
    fn test_first_tick_rates_are_zero() {
        let registry = Registry::new();
        let families = NetMetricFamilies::install(&registry).unwrap();
        let mut eth0 = NetMetrics::new(&families, "eth0");

        eth0.update(&stats("eth0", 5000, 7000), Duration::from_secs(1));

        assert_eq!(
            iface_value(&registry, "host_network_receive_bytes_per_second", "eth0"),
            0
        );
        assert_eq!(
            iface_value(&registry, "host_network_receive_bytes", "eth0"),
            5000
        );
        assert_eq!(iface_value(&registry, "host_network_send_bytes", "eth0"), 7000);
    }

    #[test]
    fn test_byte_rates_from_deltas() {
        let registry = Registry::new();
        let families = NetMetricFamilies::install(&registry).unwrap();
        let mut eth0 = NetMetrics::new(&families, "eth0");

        eth0.update(&stats("eth0", 0, 0), Duration::from_secs(2));
        eth0.update(&stats("eth0", 1_000_000, 500_000), Duration::from_secs(2));

        assert_eq!(
            iface_value(&registry, "host_network_receive_bytes_per_second", "eth0"),
            500_000
        );
        assert_eq!(
            iface_value(&registry, "host_network_send_bytes_per_second", "eth0"),
            250_000
        );
    }

    #[test]
    fn test_counter_reset_zeroes_rate() {
        let registry = Registry::new();
        let families = NetMetricFamilies::install(&registry).unwrap();
        let mut eth0 = NetMetrics::new(&families, "eth0");

        eth0.update(&stats("eth0", 1_000_000, 1_000_000), Duration::from_secs(1));
        let reset = eth0.update(&stats("eth0", 100, 1_000_500), Duration::from_secs(1));

        assert!(reset);
        assert_eq!(
            iface_value(&registry, "host_network_receive_bytes_per_second", "eth0"),
            0
        );
        assert_eq!(
            iface_value(&registry, "host_network_send_bytes_per_second", "eth0"),
            500
        );
    }

    #[test]
    fn test_error_and_drop_counters_mirrored() {
        let registry = Registry::new();
        let families = NetMetricFamilies::install(&registry).unwrap();
        let mut eth0 = NetMetrics::new(&families, "eth0");

        let curr = NetDevStats {
            interface: "eth0".to_string(),
            rx_errs: 5,
            rx_drop: 10,
            tx_errs: 2,
            tx_drop: 5,
            ..NetDevStats::default()
        };
        eth0.update(&curr, Duration::from_secs(1));

        assert_eq!(iface_value(&registry, "host_network_receive_errors", "eth0"), 5);
        assert_eq!(iface_value(&registry, "host_network_receive_dropped", "eth0"), 10);
        assert_eq!(iface_value(&registry, "host_network_send_errors", "eth0"), 2);
        assert_eq!(iface_value(&registry, "host_network_send_dropped", "eth0"), 5);
    }

    #[test]
    fn test_last_bytes_accessor() {
        let registry = Registry::new();
        let families = NetMetricFamilies::install(&registry).unwrap();
        let mut eth0 = NetMetrics::new(&families, "eth0");

        assert_eq!(eth0.last_bytes(), None);
        eth0.update(&stats("eth0", 111, 222), Duration::from_secs(1));
        assert_eq!(eth0.last_bytes(), Some((222, 111)));
    }
}
