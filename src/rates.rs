//! Delta and rate computation over cumulative counters.
//!
//! This module is the single source of truth for counter arithmetic: the
//! regression-safe delta used by every metric group, and the pure
//! reductions over caller-maintained sample histories. The reductions do
//! not touch manager state; callers keep their own histories at whatever
//! spacing suits them.

use std::collections::BTreeMap;

/// Milliseconds of io-time a device can accumulate per second of wall clock.
const IO_TIME_MS_PER_SEC: i64 = 1000;

/// Compute a cumulative-counter delta, returning `None` on regression
/// (counter reset).
pub fn counter_delta(curr: u64, prev: u64) -> Option<u64> {
    if curr >= prev { Some(curr - prev) } else { None }
}

/// Compute a cumulative-counter delta, treating a regression as zero and
/// flagging it in `reset`.
pub fn delta_or_reset(curr: u64, prev: u64, reset: &mut bool) -> u64 {
    match counter_delta(curr, prev) {
        Some(d) => d,
        None => {
            *reset = true;
            0
        }
    }
}

/// Maximum single-device I/O utilization over a sample history, in percent.
///
/// `history` maps device name to cumulative io-time samples (ms) taken at
/// `interval_sec` spacing. For every adjacent pair the utilization is
/// `(s[t] - s[t-1]) / (interval_sec * 1000)` expressed as a percentage;
/// the maximum across all pairs and all devices is returned, floored at 0.
/// Histories with fewer than two samples contribute nothing.
pub fn get_max_io_util(history: &BTreeMap<String, Vec<i64>>, interval_sec: i64) -> i64 {
    if interval_sec <= 0 {
        return 0;
    }

    let mut max_util = 0;
    for samples in history.values() {
        for pair in samples.windows(2) {
            let delta = (pair[1] - pair[0]).max(0);
            max_util = max_util.max(delta * 100 / (interval_sec * IO_TIME_MS_PER_SEC));
        }
    }
    max_util
}

/// Maximum observed send and receive rates over sample histories, in
/// bytes per second.
///
/// `send_history` and `rcv_history` map interface name to cumulative byte
/// counters sampled at `interval_sec` spacing. The two maxima are computed
/// independently; they need not come from the same interface or the same
/// sample pair. Each is floored at 0.
pub fn get_max_net_traffic(
    send_history: &BTreeMap<String, Vec<i64>>,
    rcv_history: &BTreeMap<String, Vec<i64>>,
    interval_sec: i64,
) -> (i64, i64) {
    (
        max_byte_rate(send_history, interval_sec),
        max_byte_rate(rcv_history, interval_sec),
    )
}

fn max_byte_rate(history: &BTreeMap<String, Vec<i64>>, interval_sec: i64) -> i64 {
    if interval_sec <= 0 {
        return 0;
    }

    let mut max_rate = 0;
    for samples in history.values() {
        for pair in samples.windows(2) {
            let delta = (pair[1] - pair[0]).max(0);
            max_rate = max_rate.max(delta / interval_sec);
        }
    }
    max_rate
}
