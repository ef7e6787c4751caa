//! Fabric bus abstraction.
//!
//! Everything the harness does to hardware goes through this trait: a
//! 32-bit word read, a 32-bit word write, and a data-cache flush. The
//! register-level primitives themselves (volatile MMIO, the platform cache
//! instruction) live in the backends.

use std::fmt::Debug;

/// Word-addressed register bus over the fabric window.
///
/// Reads take `&self`: status registers may change underneath the CPU (a
/// dispatcher deasserting its busy bit), but reading them never requires
/// exclusive access. Writes and cache maintenance take `&mut self`.
pub trait FabricBus: Debug {
    /// Read a 32-bit word at a fabric byte address.
    fn read32(&self, addr: u32) -> u32;

    /// Write a 32-bit word at a fabric byte address.
    fn write32(&mut self, addr: u32, value: u32);

    /// Push any CPU-cached writes within `[addr, addr + len_bytes)` to the
    /// coherence point. Blocking; returns only once a bus master reading
    /// the range will observe the committed data.
    fn flush_dcache(&mut self, addr: u32, len_bytes: u32);

    /// Read a word-indexed register, `IORD` style.
    fn read_word(&self, base: u32, index: u32) -> u32 {
        self.read32(base + index * sgdma_chip::regs::WORD_BYTES)
    }

    /// Write a word-indexed register, `IOWR` style.
    fn write_word(&mut self, base: u32, index: u32, value: u32) {
        self.write32(base + index * sgdma_chip::regs::WORD_BYTES, value);
    }
}
