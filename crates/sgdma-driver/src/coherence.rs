//! Cache coherence for DMA-visible buffers.
//!
//! The CPU's data cache is write-back: a store to a source buffer can sit
//! in a cache line long after the store retires. A dispatcher reading that
//! buffer over the fabric sees main memory, not the cache, so every
//! CPU-written range must be flushed to the coherence point before any
//! descriptor that reads it is committed.
//!
//! The destination range gets the same treatment when the CPU has seeded it
//! (the debug pattern before a streaming test): a dirty line written back
//! after the DMA completes would silently corrupt the result.

use crate::bus::FabricBus;

/// Push CPU-cached writes in `[base, base + len_bytes)` to main memory.
///
/// Blocking and synchronous; when this returns, a bus master reading the
/// range observes the committed data. Call it after the last CPU write to
/// the range and before submitting any descriptor that reads it.
pub fn flush_range(bus: &mut impl FabricBus, base: u32, len_bytes: u32) {
    tracing::debug!("dcache flush [{base:#x}, +{len_bytes:#x})");
    bus.flush_dcache(base, len_bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::sim::SimFabric;
    use sgdma_chip::regs;

    #[test]
    fn flush_commits_dirty_lines() {
        let mut bus = SimFabric::new();
        for i in 0..regs::BUFFER_WORDS as u32 {
            bus.write_word(regs::SCRATCH_BASE, i, 400 + i);
        }
        assert_eq!(bus.dirty_lines(), regs::BUFFER_WORDS);

        flush_range(&mut bus, regs::SCRATCH_BASE, regs::BUFFER_BYTES);
        assert_eq!(bus.dirty_lines(), 0);
    }
}
