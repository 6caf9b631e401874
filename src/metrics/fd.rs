//! File descriptor metric group: direct gauges, no deltas.

use prometheus::{IntGauge, Registry};

use crate::collector::procfs::FileNr;

pub(crate) struct FileDescriptorMetrics {
    allocated: IntGauge,
    unused: IntGauge,
    max: IntGauge,
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, prometheus::Error> {
    let g = IntGauge::new(name, help)?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

impl FileDescriptorMetrics {
    pub fn install(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            allocated: gauge(registry, "host_fd_allocated", "Allocated file handles")?,
            unused: gauge(
                registry,
                "host_fd_unused",
                "Allocated but unused file handles",
            )?,
            max: gauge(registry, "host_fd_max", "Maximum file handles")?,
        })
    }

    pub fn update(&self, fd: &FileNr) {
        self.allocated.set(fd.allocated as i64);
        self.unused.set(fd.unused as i64);
        self.max.set(fd.max as i64);
    }
}
