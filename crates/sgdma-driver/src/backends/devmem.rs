//! Memory-mapped fabric window over `/dev/mem`.
//!
//! The accelerator fabric hangs off the HPS-to-FPGA lightweight bridge; its
//! whole register space fits in one physically contiguous window. This
//! backend maps that window once and serves volatile 32-bit accesses.
//!
//! Uses rustix for mmap/munmap; `/dev/mem` is opened with `O_SYNC` so the
//! mapping is uncached and device-ordered.

// MMIO registers are naturally aligned by hardware, so pointer casts are safe
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::ptr_as_ptr)]
#![allow(clippy::cast_ptr_alignment)]

use crate::bus::FabricBus;
use crate::error::Result;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsFd;
use std::sync::atomic::{fence, Ordering};

/// Physical base of the fabric window behind the lightweight bridge.
pub const FABRIC_PHYS_BASE: u64 = 0xFF20_0000;

/// Span of the fabric window in bytes. Covers every region in
/// [`sgdma_chip::regs`].
pub const FABRIC_SPAN: usize = 0x0004_0000;

/// The real fabric, mapped from `/dev/mem`.
pub struct DevMemFabric {
    ptr: *mut u8,
    size: usize,
}

impl std::fmt::Debug for DevMemFabric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevMemFabric")
            .field("ptr", &format_args!("{:p}", self.ptr))
            .field("size", &self.size)
            .finish()
    }
}

// SAFETY: Send - DevMemFabric owns the mapping exclusively; mmap'd memory is
// process-wide and moving the handle between threads does not invalidate it.
unsafe impl Send for DevMemFabric {}

impl DevMemFabric {
    /// Map the fabric window at [`FABRIC_PHYS_BASE`].
    ///
    /// # Errors
    ///
    /// Returns an error if `/dev/mem` cannot be opened (requires root or
    /// `CAP_SYS_RAWIO`) or the mapping fails.
    pub fn open() -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open("/dev/mem")?;

        // SAFETY: mmap necessary for MMIO - maps the bridge window into the
        // process. Invariants: (1) file is a valid open /dev/mem fd;
        // (2) FABRIC_PHYS_BASE/FABRIC_SPAN describe a real fabric window;
        // (3) ptr valid for FABRIC_SPAN bytes or Err.
        let ptr = unsafe {
            mmap(
                std::ptr::null_mut(),
                FABRIC_SPAN,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                FABRIC_PHYS_BASE,
            )
            .map_err(|e| std::io::Error::from_raw_os_error(e.raw_os_error()))?
        };

        tracing::info!(
            "Mapped fabric window at {:p} (phys {:#x}, {} KB)",
            ptr,
            FABRIC_PHYS_BASE,
            FABRIC_SPAN / 1024
        );

        Ok(Self {
            ptr: ptr.cast(),
            size: FABRIC_SPAN,
        })
    }
}

impl FabricBus for DevMemFabric {
    fn read32(&self, addr: u32) -> u32 {
        let offset = addr as usize;
        assert!(offset + 4 <= self.size, "register address out of window");
        // SAFETY: read_volatile necessary for MMIO - hardware can change the
        // value. ptr is valid for self.size bytes (from mmap in open());
        // offset is bounds-checked; u32 accesses are naturally aligned.
        unsafe { std::ptr::read_volatile(self.ptr.add(offset).cast::<u32>()) }
    }

    fn write32(&mut self, addr: u32, value: u32) {
        let offset = addr as usize;
        assert!(offset + 4 <= self.size, "register address out of window");
        // SAFETY: write_volatile necessary for MMIO - triggers hardware side
        // effects. Same bounds/alignment invariants as read32.
        unsafe {
            std::ptr::write_volatile(self.ptr.add(offset).cast::<u32>(), value);
        }
    }

    fn flush_dcache(&mut self, _addr: u32, _len_bytes: u32) {
        // The O_SYNC mapping is uncached; ordering against the dispatcher's
        // first read is all that is needed.
        fence(Ordering::SeqCst);
    }
}

impl Drop for DevMemFabric {
    fn drop(&mut self) {
        // SAFETY: ptr/size come from the successful mmap in open(); Drop
        // runs at most once and no accessor outlives self.
        unsafe {
            let _ = munmap(self.ptr.cast(), self.size);
        }
        tracing::debug!("Unmapped fabric window");
    }
}
