//! Fabric memory map and register layout.
//!
//! All addresses are byte offsets inside the fabric window exposed through
//! the HPS-to-FPGA lightweight bridge. One word is 4 bytes; the word-indexed
//! `IORD`/`IOWR` convention of the original firmware maps to
//! `base + index * WORD_BYTES` here.
//!
//! ```text
//! 0x0000_0000  scratch RAM, 1024 words   (cacheable; source buffers)
//! 0x0001_0000  dual-port RAM, 256 words  (uncached MMIO; destination)
//! 0x0002_0000  stream-multdiv processor  (4 registers)
//! 0x0003_0000  mSGDMA dispatchers       (CSR + descriptor port each)
//! ```

/// Bytes per bus word.
pub const WORD_BYTES: u32 = 4;

/// Words in one transfer buffer. Every descriptor in this harness covers
/// exactly this many words.
pub const BUFFER_WORDS: usize = 256;

/// Byte length of one transfer buffer.
pub const BUFFER_BYTES: u32 = (BUFFER_WORDS as u32) * WORD_BYTES;

// ── Memory regions ───────────────────────────────────────────────────────────

/// On-chip scratch RAM holding CPU-initialized source buffers.
pub const SCRATCH_BASE: u32 = 0x0000_0000;
/// Scratch RAM size in words.
pub const SCRATCH_WORDS: usize = 1024;

/// Dual-port destination RAM, word-indexed from the CPU side.
pub const DEST_BASE: u32 = 0x0001_0000;
/// Destination RAM size in words.
pub const DEST_WORDS: usize = 256;

// ── Stream-multdiv processor ─────────────────────────────────────────────────

/// Stream-multdiv processor register base.
pub const STREAM_MULTDIV_BASE: u32 = 0x0002_0000;

/// Fixed denominator of the multdiv pipeline: `out = in * coeff / 400`.
pub const STREAM_DIVISOR: i32 = 400;

/// Stream-multdiv register word offsets.
pub mod multdiv {
    /// Coefficient numerator (read/write).
    pub const COEFFICIENT: u32 = 0;
    /// Bypass mode: 0 = multiply-divide active, 1 = passthrough (read/write).
    pub const BYPASS: u32 = 1;
    /// Count of valid beats accepted on the input interface (read-only).
    pub const VALID_COUNT: u32 = 2;
    /// Last input word seen on the stream (read-only).
    pub const LAST_INPUT: u32 = 3;
}

// ── mSGDMA dispatchers ───────────────────────────────────────────────────────

/// Memory-to-memory dispatcher CSR base.
pub const MSGDMA_MM_CSR: u32 = 0x0003_0000;
/// Memory-to-memory dispatcher descriptor port base.
pub const MSGDMA_MM_DESC: u32 = 0x0003_0020;

/// Read (memory→stream) dispatcher CSR base.
pub const MSGDMA_RD_CSR: u32 = 0x0003_0100;
/// Read dispatcher descriptor port base.
pub const MSGDMA_RD_DESC: u32 = 0x0003_0120;

/// Write (stream→memory) dispatcher CSR base.
pub const MSGDMA_WR_CSR: u32 = 0x0003_0200;
/// Write dispatcher descriptor port base.
pub const MSGDMA_WR_DESC: u32 = 0x0003_0220;

/// Dispatcher CSR byte offsets and bit masks.
pub mod csr {
    /// Status register.
    pub const STATUS: u32 = 0x0;
    /// Control register.
    pub const CONTROL: u32 = 0x4;

    /// Status bits.
    pub mod status {
        /// Dispatcher is processing a descriptor.
        pub const BUSY: u32 = 1 << 0;
        /// Descriptor FIFO is empty.
        pub const DESC_BUF_EMPTY: u32 = 1 << 1;
    }
}

/// Dispatcher descriptor-port byte offsets (standard descriptor format).
///
/// Writing [`desc::CONTROL`] with [`desc::control::GO`] set commits the
/// descriptor and starts the transfer; the other fields must be written
/// first.
pub mod desc {
    /// Source (read) address. Zero for stream→memory descriptors.
    pub const READ_ADDR: u32 = 0x0;
    /// Destination (write) address. Zero for memory→stream descriptors.
    pub const WRITE_ADDR: u32 = 0x4;
    /// Transfer length in bytes.
    pub const LENGTH: u32 = 0x8;
    /// Descriptor control word; writing it commits the descriptor.
    pub const CONTROL: u32 = 0xC;

    /// Descriptor control bits.
    pub mod control {
        /// Commit the descriptor and start the transfer.
        pub const GO: u32 = 1 << 31;
    }
}

/// Logical device names, as the board support package registers them.
pub mod devices {
    /// Memory-to-memory dispatcher (copy-speed comparison).
    pub const MSGDMA_ONCHIP_DP: &str = "msgdma_onchip_dp";
    /// Read dispatcher feeding the stream processor.
    pub const MSGDMA_READ: &str = "msgdma_read";
    /// Write dispatcher draining the stream processor.
    pub const MSGDMA_WRITE: &str = "msgdma_write";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_layout() {
        // Regions must not overlap.
        assert!(SCRATCH_BASE + (SCRATCH_WORDS as u32) * WORD_BYTES <= DEST_BASE);
        assert!(DEST_BASE + (DEST_WORDS as u32) * WORD_BYTES <= STREAM_MULTDIV_BASE);
        assert!(STREAM_MULTDIV_BASE + 4 * WORD_BYTES <= MSGDMA_MM_CSR);
    }

    #[test]
    fn descriptor_port_layout() {
        assert_eq!(desc::READ_ADDR, 0x0);
        assert_eq!(desc::CONTROL, 0xC);
        assert_ne!(csr::status::BUSY, 0);
    }

    #[test]
    fn buffer_fits_regions() {
        assert!(BUFFER_WORDS <= SCRATCH_WORDS);
        assert_eq!(BUFFER_WORDS, DEST_WORDS);
    }
}
