//! Parsers for `/proc` counter sources.
//!
//! These are pure functions that parse the content of the counter files
//! into structured snapshots. They are designed to be easily testable with
//! string inputs. Parsers tolerate extra whitespace and extra trailing
//! columns (future kernel fields) but fail on lines with too few columns
//! to satisfy the known fields.

use std::fmt;

use thiserror::Error;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

/// Aggregate CPU time buckets from the `cpu ` line of `/proc/stat`.
///
/// All values are monotonically non-decreasing jiffy counts since boot.
/// `user` through `idle` are mandatory; later buckets appeared in newer
/// kernels and default to 0 when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

impl CpuStat {
    /// Buckets in metric declaration order.
    pub fn buckets(&self) -> [u64; 10] {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
            self.guest,
            self.guest_nice,
        ]
    }

    /// Sum of all buckets.
    pub fn total(&self) -> u64 {
        self.buckets().iter().sum()
    }
}

/// Parses the aggregate `cpu ` line out of `/proc/stat` content.
///
/// Per-CPU lines (`cpu0`, `cpu1`, ...) and the other stat lines (`intr`,
/// `ctxt`, ...) are ignored.
pub fn parse_cpu_stat(content: &str) -> Result<CpuStat, ParseError> {
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        if parts.next() != Some("cpu") {
            continue;
        }

        let fields: Vec<u64> = parts
            .map(|s| {
                s.parse()
                    .map_err(|_| ParseError::new(format!("invalid cpu field: {s:?}")))
            })
            .collect::<Result<_, _>>()?;

        if fields.len() < 4 {
            return Err(ParseError::new(format!(
                "cpu line has {} fields, expected at least 4",
                fields.len()
            )));
        }

        let get = |idx: usize| -> u64 { fields.get(idx).copied().unwrap_or(0) };

        return Ok(CpuStat {
            user: get(0),
            nice: get(1),
            system: get(2),
            idle: get(3),
            iowait: get(4),
            irq: get(5),
            softirq: get(6),
            steal: get(7),
            guest: get(8),
            guest_nice: get(9),
        });
    }

    Err(ParseError::new("missing aggregate cpu line"))
}

/// Memory gauges from `/proc/meminfo`, converted to bytes.
///
/// These are instantaneous quantities, not cumulative counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total: u64,
    pub free: u64,
    pub available: u64,
    pub buffers: u64,
    pub cached: u64,
    pub dirty: u64,
    pub writeback: u64,
    pub slab: u64,
    pub slab_reclaimable: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

impl MemInfo {
    /// Swap currently in use.
    pub fn swap_used(&self) -> u64 {
        self.swap_total.saturating_sub(self.swap_free)
    }
}

/// Parses `/proc/meminfo` content.
///
/// The source reports kB; values are returned in bytes. Fields beyond the
/// tracked set are ignored. `MemTotal` and `MemFree` must be present.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();
    let mut seen_total = false;
    let mut seen_free = false;

    let parse_bytes = |line: &str| -> u64 {
        line.split_whitespace()
            .nth(1)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0)
            * 1024
    };

    for line in content.lines() {
        if line.starts_with("MemTotal:") {
            info.total = parse_bytes(line);
            seen_total = true;
        } else if line.starts_with("MemFree:") {
            info.free = parse_bytes(line);
            seen_free = true;
        } else if line.starts_with("MemAvailable:") {
            info.available = parse_bytes(line);
        } else if line.starts_with("Buffers:") {
            info.buffers = parse_bytes(line);
        } else if line.starts_with("Cached:") {
            info.cached = parse_bytes(line);
        } else if line.starts_with("Dirty:") {
            info.dirty = parse_bytes(line);
        } else if line.starts_with("Writeback:") {
            info.writeback = parse_bytes(line);
        } else if line.starts_with("Slab:") {
            info.slab = parse_bytes(line);
        } else if line.starts_with("SReclaimable:") {
            info.slab_reclaimable = parse_bytes(line);
        } else if line.starts_with("SwapTotal:") {
            info.swap_total = parse_bytes(line);
        } else if line.starts_with("SwapFree:") {
            info.swap_free = parse_bytes(line);
        }
    }

    if !seen_total || !seen_free {
        return Err(ParseError::new("missing MemTotal/MemFree"));
    }

    Ok(info)
}

/// Per-device counters from `/proc/diskstats`.
///
/// All fields are cumulative since device attach, except `io_in_progress`
/// which is an instantaneous queue depth. Sector counts are in 512-byte
/// units regardless of the device's physical sector size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskStats {
    /// Device name (sda, nvme0n1, ...).
    pub device: String,
    /// Reads completed.
    pub reads_completed: u64,
    /// Sectors read.
    pub sectors_read: u64,
    /// Time spent reading (ms).
    pub read_time_ms: u64,
    /// Writes completed.
    pub writes_completed: u64,
    /// Sectors written.
    pub sectors_written: u64,
    /// Time spent writing (ms).
    pub write_time_ms: u64,
    /// I/Os currently in progress.
    pub io_in_progress: u64,
    /// Time spent with at least one I/O outstanding (ms).
    pub io_time_ms: u64,
    /// Weighted time spent doing I/O (ms).
    pub io_time_weighted_ms: u64,
}

/// Parses `/proc/diskstats` content.
///
/// Format: major minor name reads r_merged r_sectors r_time writes
/// w_merged w_sectors w_time io_pending io_time w_io_time [discards ...].
/// Kernels past 4.18 append discard and flush columns; those are ignored.
pub fn parse_diskstats(content: &str) -> Result<Vec<DiskStats>, ParseError> {
    let mut disks = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() < 14 {
            return Err(ParseError::new(format!(
                "diskstats line has {} fields, expected at least 14",
                parts.len()
            )));
        }

        let get_val =
            |idx: usize| -> u64 { parts.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        disks.push(DiskStats {
            device: parts[2].to_string(),
            reads_completed: get_val(3),
            sectors_read: get_val(5),
            read_time_ms: get_val(6),
            writes_completed: get_val(7),
            sectors_written: get_val(9),
            write_time_ms: get_val(10),
            io_in_progress: get_val(11),
            io_time_ms: get_val(12),
            io_time_weighted_ms: get_val(13),
        });
    }

    Ok(disks)
}

/// Column layout of `/proc/net/dev`, detected from the header line.
///
/// The layout has changed across kernel history; parsing with the wrong
/// offsets silently shifts every field, so the detected layout is carried
/// alongside the parsed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetDevFormat {
    /// Pre-byte-counter layout (packets first). Carries no byte counters.
    V1,
    /// Byte counters present, no compressed/multicast columns.
    V2,
    /// Byte counters plus compressed/multicast columns (modern kernels).
    V3,
}

impl fmt::Display for NetDevFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetDevFormat::V1 => write!(f, "v1"),
            NetDevFormat::V2 => write!(f, "v2"),
            NetDevFormat::V3 => write!(f, "v3"),
        }
    }
}

/// Per-interface counters from `/proc/net/dev`. All cumulative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetDevStats {
    /// Interface name (eth0, lo, ...).
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errs: u64,
    pub rx_drop: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errs: u64,
    pub tx_drop: u64,
}

/// Parses `/proc/net/dev` content.
///
/// The second header line names the columns and identifies the layout:
///
/// ```text
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes ...
///     lo: 1234567     1234    0    0    0     0          0         0  1234567 ...
/// ```
///
/// Returns the detected layout together with the parsed interfaces so the
/// caller can notice a layout change between reads. The v1 layout carries
/// no byte counters and is rejected.
pub fn parse_net_dev(content: &str) -> Result<(NetDevFormat, Vec<NetDevStats>), ParseError> {
    let mut format = None;
    let mut devices = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if line.contains('|') {
            // Header pair; the column-name line decides the layout.
            if line.contains("compressed") {
                format = Some(NetDevFormat::V3);
            } else if line.contains("bytes") {
                format = Some(NetDevFormat::V2);
            } else if format.is_none() && line.contains("packets") {
                format = Some(NetDevFormat::V1);
            }
            continue;
        }

        let format = match format {
            Some(NetDevFormat::V1) => {
                return Err(ParseError::new(
                    "unsupported v1 net/dev layout (no byte counters)",
                ));
            }
            Some(f) => f,
            None => return Err(ParseError::new("missing net/dev header")),
        };

        let Some((name, rest)) = line.split_once(':') else {
            return Err(ParseError::new(format!("malformed net/dev line: {line:?}")));
        };

        let values: Vec<&str> = rest.split_whitespace().collect();
        // rx columns then tx columns; tx offset depends on the layout.
        let (min_fields, tx_base) = match format {
            NetDevFormat::V3 => (16, 8),
            NetDevFormat::V2 => (12, 6),
            NetDevFormat::V1 => unreachable!(),
        };
        if values.len() < min_fields {
            return Err(ParseError::new(format!(
                "net/dev line for {:?} has {} fields, expected at least {}",
                name.trim(),
                values.len(),
                min_fields
            )));
        }

        let get_val =
            |idx: usize| -> u64 { values.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        devices.push(NetDevStats {
            interface: name.trim().to_string(),
            rx_bytes: get_val(0),
            rx_packets: get_val(1),
            rx_errs: get_val(2),
            rx_drop: get_val(3),
            tx_bytes: get_val(tx_base),
            tx_packets: get_val(tx_base + 1),
            tx_errs: get_val(tx_base + 2),
            tx_drop: get_val(tx_base + 3),
        });
    }

    match format {
        Some(NetDevFormat::V1) => Err(ParseError::new(
            "unsupported v1 net/dev layout (no byte counters)",
        )),
        Some(f) => Ok((f, devices)),
        None => Err(ParseError::new("missing net/dev header")),
    }
}

/// File descriptor gauges from `/proc/sys/fs/file-nr`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileNr {
    /// Allocated file handles.
    pub allocated: u64,
    /// Allocated but unused file handles.
    pub unused: u64,
    /// Maximum file handles.
    pub max: u64,
}

/// Parses `/proc/sys/fs/file-nr` content: `allocated unused max`.
pub fn parse_file_nr(content: &str) -> Result<FileNr, ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(ParseError::new(format!(
            "file-nr has {} fields, expected 3",
            parts.len()
        )));
    }

    let field = |idx: usize, name: &str| -> Result<u64, ParseError> {
        parts[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {name}: {:?}", parts[idx])))
    };

    Ok(FileNr {
        allocated: field(0, "allocated")?,
        unused: field(1, "unused")?,
        max: field(2, "max")?,
    })
}
