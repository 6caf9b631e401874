//! Reader binding the `/proc` counter sources to the pure parsers.

use std::path::Path;

use thiserror::Error;

use crate::collector::procfs::parser::{
    CpuStat, DiskStats, FileNr, MemInfo, NetDevFormat, NetDevStats, parse_cpu_stat,
    parse_diskstats, parse_file_nr, parse_meminfo, parse_net_dev,
};
use crate::collector::traits::FileSystem;

/// Error type for collection failures.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Counter source missing or unreadable.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A line or field did not match the expected shape.
    #[error("parse error: {0}")]
    Parse(String),
    /// The network counter layout changed between reads.
    #[error("net/dev layout changed: was {expected}, now {detected}")]
    FormatChanged {
        expected: NetDevFormat,
        detected: NetDevFormat,
    },
}

/// Reads counter sources under a proc root through a [`FileSystem`].
///
/// One read buffer is reused across calls; a reader is single-writer by
/// construction.
pub struct ProcReader<F: FileSystem> {
    fs: F,
    proc_path: String,
    line_buf: String,
}

impl<F: FileSystem> ProcReader<F> {
    /// Creates a new reader.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            line_buf: String::new(),
        }
    }

    fn read(&mut self, rel: &str) -> Result<&str, CollectError> {
        let path = format!("{}/{}", self.proc_path, rel);
        self.fs.read_into(Path::new(&path), &mut self.line_buf)?;
        Ok(&self.line_buf)
    }

    /// Reads the aggregate CPU time buckets from `/proc/stat`.
    pub fn collect_cpu(&mut self) -> Result<CpuStat, CollectError> {
        let content = self.read("stat")?;
        parse_cpu_stat(content).map_err(|e| CollectError::Parse(e.message))
    }

    /// Reads memory gauges from `/proc/meminfo`.
    pub fn collect_meminfo(&mut self) -> Result<MemInfo, CollectError> {
        let content = self.read("meminfo")?;
        parse_meminfo(content).map_err(|e| CollectError::Parse(e.message))
    }

    /// Reads per-device I/O counters from `/proc/diskstats`.
    pub fn collect_diskstats(&mut self) -> Result<Vec<DiskStats>, CollectError> {
        let content = self.read("diskstats")?;
        parse_diskstats(content).map_err(|e| CollectError::Parse(e.message))
    }

    /// Reads per-interface counters from `/proc/net/dev`.
    ///
    /// Returns the detected column layout alongside the counters.
    pub fn collect_net_dev(&mut self) -> Result<(NetDevFormat, Vec<NetDevStats>), CollectError> {
        let content = self.read("net/dev")?;
        parse_net_dev(content).map_err(|e| CollectError::Parse(e.message))
    }

    /// Reads file descriptor gauges from `/proc/sys/fs/file-nr`.
    pub fn collect_file_nr(&mut self) -> Result<FileNr, CollectError> {
        let content = self.read("sys/fs/file-nr")?;
        parse_file_nr(content).map_err(|e| CollectError::Parse(e.message))
    }
}
