//! hostmetrics — Linux host resource metrics for a prometheus registry.
//!
//! Samples OS counter sources under `/proc` (CPU time breakdown, memory,
//! per-device disk I/O, per-interface network traffic, file descriptors)
//! once per external tick and exposes them as named gauges in a
//! `prometheus::Registry`:
//!
//! - `collector` — the `FileSystem` seam, pure `/proc` parsers, and the
//!   `ProcReader` that binds them to a proc root
//! - `metrics` — per-category metric groups and the `SystemMetrics`
//!   manager driving one update pass per tick
//! - `rates` — regression-safe counter deltas and pure reductions over
//!   caller-maintained sample histories
//!
//! # Usage
//!
//! ```no_run
//! use std::collections::BTreeSet;
//! use hostmetrics::{RealFs, SystemMetrics};
//! use prometheus::Registry;
//!
//! let registry = Registry::new();
//! let mut metrics = SystemMetrics::new(RealFs::new(), "/proc");
//!
//! let disks: BTreeSet<String> = ["sda".to_string()].into();
//! let interfaces = vec!["eth0".to_string()];
//! metrics.install(&registry, &disks, &interfaces);
//!
//! // Driven by the host's scheduler, once per tick:
//! metrics.update();
//! ```

pub mod collector;
pub mod metrics;
pub mod rates;

pub use collector::{CollectError, FileSystem, MockFs, ProcReader, RealFs};
pub use metrics::{SECTOR_SIZE, SystemMetrics, UPDATE_HOOK_NAME};
