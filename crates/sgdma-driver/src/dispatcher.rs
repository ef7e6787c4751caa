//! Dispatcher transfer engine.
//!
//! A [`Dispatcher`] is one mSGDMA endpoint, opened by logical name through
//! the fabric capability table. `submit` is fire-and-forget: it writes the
//! descriptor fields to the dispatcher's descriptor port and commits with
//! the GO bit, returning before the hardware has moved a byte. Completion
//! is the caller's problem, detected by spinning on the busy bit.
//!
//! For a two-dispatcher streaming pipeline the launch order is mandatory:
//! submit the write (sink) dispatcher first, then the read (source)
//! dispatcher — the sink must be armed before the source starts pushing
//! beats, or data issued before the sink is ready is lost. Completion is
//! polled on the **write** dispatcher only; the read side going idle says
//! nothing about data still in flight through the write path.

use crate::bus::FabricBus;
use crate::capabilities::FabricCapabilities;
use crate::error::{Result, SgdmaError};
use sgdma_chip::regs::{csr, desc};
use sgdma_chip::Descriptor;

/// Handle to one mSGDMA dispatcher. Opened once per run, never closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatcher {
    name: String,
    csr_base: u32,
    desc_base: u32,
}

impl Dispatcher {
    /// Open a dispatcher by logical name.
    ///
    /// # Errors
    ///
    /// Returns [`SgdmaError::DeviceNotFound`] if the name does not resolve.
    pub fn open(caps: &FabricCapabilities, name: &str) -> Result<Self> {
        let entry = caps.dispatcher(name)?;
        tracing::debug!(
            "opened dispatcher {name} (csr {:#x}, desc {:#x})",
            entry.csr_base,
            entry.desc_base
        );
        Ok(Self {
            name: entry.name.clone(),
            csr_base: entry.csr_base,
            desc_base: entry.desc_base,
        })
    }

    /// Logical device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start an asynchronous transfer. Returns as soon as the descriptor is
    /// committed; the hardware runs on its own from here.
    pub fn submit(&self, bus: &mut impl FabricBus, descriptor: &Descriptor) {
        bus.write32(
            self.desc_base + desc::READ_ADDR,
            descriptor.read_addr_field(),
        );
        bus.write32(
            self.desc_base + desc::WRITE_ADDR,
            descriptor.write_addr_field(),
        );
        bus.write32(self.desc_base + desc::LENGTH, descriptor.length);
        // The control write commits the descriptor; it must come last.
        bus.write32(self.desc_base + desc::CONTROL, descriptor.control);
        tracing::debug!("{}: submitted {} byte transfer", self.name, descriptor.length);
    }

    /// Non-destructive busy check of the status register.
    pub fn is_busy(&self, bus: &impl FabricBus) -> bool {
        bus.read32(self.csr_base + csr::STATUS) & csr::status::BUSY != 0
    }

    /// Spin until the dispatcher goes idle. Unbounded: a wedged device
    /// spins forever, which is this harness's accepted behavior.
    pub fn wait_idle(&self, bus: &impl FabricBus) {
        while self.is_busy(bus) {
            std::hint::spin_loop();
        }
    }

    /// Spin until idle or until `max_polls` status reads have been spent.
    ///
    /// Bounded variant of [`wait_idle`](Self::wait_idle) for callers that
    /// would rather diagnose a wedged dispatcher than hang.
    ///
    /// # Errors
    ///
    /// Returns [`SgdmaError::Timeout`] if the busy bit never cleared.
    pub fn wait_idle_with_budget(&self, bus: &impl FabricBus, max_polls: u64) -> Result<()> {
        for _ in 0..max_polls {
            if !self.is_busy(bus) {
                return Ok(());
            }
            std::hint::spin_loop();
        }
        tracing::warn!("{}: still busy after {max_polls} polls", self.name);
        Err(SgdmaError::Timeout { polls: max_polls })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::sim::SimFabric;
    use sgdma_chip::regs;

    #[test]
    fn open_unknown_name_fails() {
        let caps = FabricCapabilities::standard();
        assert!(matches!(
            Dispatcher::open(&caps, "no_such_dma").unwrap_err(),
            SgdmaError::DeviceNotFound { .. }
        ));
    }

    #[test]
    fn submit_then_poll_to_idle() {
        let caps = FabricCapabilities::standard();
        let mut bus = SimFabric::new();
        let dma = Dispatcher::open(&caps, regs::devices::MSGDMA_ONCHIP_DP).unwrap();

        let d = Descriptor::mm_to_mm(regs::SCRATCH_BASE, regs::DEST_BASE, regs::BUFFER_BYTES)
            .unwrap();
        dma.submit(&mut bus, &d);

        assert!(dma.is_busy(&bus));
        dma.wait_idle(&bus);
        assert!(!dma.is_busy(&bus));
    }

    #[test]
    fn budgeted_wait_times_out_on_wedged_sink() {
        let caps = FabricCapabilities::standard();
        let mut bus = SimFabric::new();
        let wr = Dispatcher::open(&caps, regs::devices::MSGDMA_WRITE).unwrap();

        // Armed sink that is never fed stays busy.
        let d = Descriptor::st_to_mm(regs::DEST_BASE, regs::BUFFER_BYTES).unwrap();
        wr.submit(&mut bus, &d);

        assert!(matches!(
            wr.wait_idle_with_budget(&bus, 50).unwrap_err(),
            SgdmaError::Timeout { polls: 50 }
        ));
    }
}
