//! Runtime fabric capability descriptor.
//!
//! The original firmware gated optional hardware behind preprocessor
//! conditionals (`#ifdef STREAM_MULTDIV_BASE`). Here the same information
//! is a runtime value checked once at startup: which dispatchers exist and
//! where their register blocks live, and whether the stream processor was
//! synthesized into this fabric. Phases that need an absent capability are
//! skipped with a warning instead of failing.

use crate::error::{Result, SgdmaError};
use sgdma_chip::regs;

/// One registered mSGDMA dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherEntry {
    /// Logical device name, as the board support package registers it.
    pub name: String,

    /// Control/status register base address.
    pub csr_base: u32,

    /// Descriptor port base address.
    pub desc_base: u32,
}

/// What this fabric build contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricCapabilities {
    /// Registered dispatchers, resolvable by logical name.
    pub dispatchers: Vec<DispatcherEntry>,

    /// Stream-multdiv processor base address, if synthesized in.
    pub stream_multdiv: Option<u32>,

    /// Destination dual-port RAM base address.
    pub dest_base: u32,

    /// Destination RAM size in words.
    pub dest_words: usize,

    /// Scratch RAM base address (source buffers).
    pub scratch_base: u32,
}

impl FabricCapabilities {
    /// Capability descriptor for the standard three-dispatcher fabric with
    /// the stream processor present.
    pub fn standard() -> Self {
        Self {
            dispatchers: vec![
                DispatcherEntry {
                    name: regs::devices::MSGDMA_ONCHIP_DP.to_owned(),
                    csr_base: regs::MSGDMA_MM_CSR,
                    desc_base: regs::MSGDMA_MM_DESC,
                },
                DispatcherEntry {
                    name: regs::devices::MSGDMA_READ.to_owned(),
                    csr_base: regs::MSGDMA_RD_CSR,
                    desc_base: regs::MSGDMA_RD_DESC,
                },
                DispatcherEntry {
                    name: regs::devices::MSGDMA_WRITE.to_owned(),
                    csr_base: regs::MSGDMA_WR_CSR,
                    desc_base: regs::MSGDMA_WR_DESC,
                },
            ],
            stream_multdiv: Some(regs::STREAM_MULTDIV_BASE),
            dest_base: regs::DEST_BASE,
            dest_words: regs::DEST_WORDS,
            scratch_base: regs::SCRATCH_BASE,
        }
    }

    /// The standard fabric with the stream processor left out, as when the
    /// multdiv unit is excluded from the synthesis.
    pub fn without_stream_processor() -> Self {
        Self {
            stream_multdiv: None,
            ..Self::standard()
        }
    }

    /// Resolve a dispatcher by logical name.
    ///
    /// # Errors
    ///
    /// Returns [`SgdmaError::DeviceNotFound`] if no dispatcher is
    /// registered under `name`.
    pub fn dispatcher(&self, name: &str) -> Result<&DispatcherEntry> {
        self.dispatchers
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| SgdmaError::device_not_found(name))
    }

    /// Stream-processor base, or the capability-gap error.
    ///
    /// # Errors
    ///
    /// Returns [`SgdmaError::StreamProcessorAbsent`] if this fabric build
    /// has no multdiv unit.
    pub fn stream_multdiv_base(&self) -> Result<u32> {
        self.stream_multdiv.ok_or(SgdmaError::StreamProcessorAbsent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_resolves_all_three_dispatchers() {
        let caps = FabricCapabilities::standard();
        for name in [
            regs::devices::MSGDMA_ONCHIP_DP,
            regs::devices::MSGDMA_READ,
            regs::devices::MSGDMA_WRITE,
        ] {
            assert!(caps.dispatcher(name).is_ok(), "missing {name}");
        }
    }

    #[test]
    fn unknown_name_is_device_not_found() {
        let caps = FabricCapabilities::standard();
        let err = caps.dispatcher("msgdma_bogus").unwrap_err();
        assert!(matches!(err, SgdmaError::DeviceNotFound { name } if name == "msgdma_bogus"));
    }

    #[test]
    fn stream_gap_reported() {
        let caps = FabricCapabilities::without_stream_processor();
        assert!(matches!(
            caps.stream_multdiv_base().unwrap_err(),
            SgdmaError::StreamProcessorAbsent
        ));
    }
}
