//! Memory metric group: instantaneous byte gauges, no deltas.

use prometheus::{IntGauge, Registry};

use crate::collector::procfs::MemInfo;

/// Gauges mirroring the tracked meminfo fields, in bytes.
pub(crate) struct MemoryMetrics {
    total: IntGauge,
    free: IntGauge,
    available: IntGauge,
    buffers: IntGauge,
    cached: IntGauge,
    dirty: IntGauge,
    writeback: IntGauge,
    slab: IntGauge,
    slab_reclaimable: IntGauge,
    swap_total: IntGauge,
    swap_free: IntGauge,
    swap_used: IntGauge,
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, prometheus::Error> {
    let g = IntGauge::new(name, help)?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

impl MemoryMetrics {
    pub fn install(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            total: gauge(registry, "host_memory_total_bytes", "Total usable RAM")?,
            free: gauge(registry, "host_memory_free_bytes", "Unused RAM")?,
            available: gauge(
                registry,
                "host_memory_available_bytes",
                "RAM available for new workloads without swapping",
            )?,
            buffers: gauge(
                registry,
                "host_memory_buffers_bytes",
                "Raw block device buffers",
            )?,
            cached: gauge(registry, "host_memory_cached_bytes", "Page cache")?,
            dirty: gauge(
                registry,
                "host_memory_dirty_bytes",
                "Memory waiting to be written back",
            )?,
            writeback: gauge(
                registry,
                "host_memory_writeback_bytes",
                "Memory actively being written back",
            )?,
            slab: gauge(
                registry,
                "host_memory_slab_bytes",
                "Kernel slab allocations",
            )?,
            slab_reclaimable: gauge(
                registry,
                "host_memory_slab_reclaimable_bytes",
                "Reclaimable kernel slab allocations",
            )?,
            swap_total: gauge(registry, "host_memory_swap_total_bytes", "Total swap")?,
            swap_free: gauge(registry, "host_memory_swap_free_bytes", "Unused swap")?,
            swap_used: gauge(registry, "host_memory_swap_used_bytes", "Swap in use")?,
        })
    }

    /// Writes the gauges directly; these are instantaneous quantities.
    pub fn update(&self, info: &MemInfo) {
        self.total.set(info.total as i64);
        self.free.set(info.free as i64);
        self.available.set(info.available as i64);
        self.buffers.set(info.buffers as i64);
        self.cached.set(info.cached as i64);
        self.dirty.set(info.dirty as i64);
        self.writeback.set(info.writeback as i64);
        self.slab.set(info.slab as i64);
        self.slab_reclaimable.set(info.slab_reclaimable as i64);
        self.swap_total.set(info.swap_total as i64);
        self.swap_free.set(info.swap_free as i64);
        self.swap_used.set(info.swap_used() as i64);
    }
}
