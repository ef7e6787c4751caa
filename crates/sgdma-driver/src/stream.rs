//! Stream-multdiv processor controller.
//!
//! The arithmetic unit sits between the read and write dispatchers and
//! computes `out = in * coefficient / 400` per beat, or passes data through
//! untouched in bypass mode. Configuration is registers-before-data:
//! coefficient and bypass must be written before the streaming transfer is
//! submitted — writes after submission do not affect beats already in
//! flight.

use crate::bus::FabricBus;
use crate::capabilities::FabricCapabilities;
use crate::error::Result;
use sgdma_chip::regs::multdiv;

/// Controller for the stream-multdiv unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamProcessor {
    base: u32,
}

/// Read-only telemetry from the unit, used to sanity-check that the
/// hardware pipeline actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDiagnostics {
    /// Coefficient echoed back by the hardware.
    pub coefficient: i32,
    /// Bypass mode as the hardware sees it.
    pub bypass: bool,
    /// Beats accepted on the input interface since reset.
    pub valid_count: u32,
    /// Last input word seen on the stream.
    pub last_input: u32,
}

impl StreamProcessor {
    /// Bind to the unit, if this fabric build has one.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SgdmaError::StreamProcessorAbsent`] when the
    /// capability descriptor carries no multdiv base.
    pub fn open(caps: &FabricCapabilities) -> Result<Self> {
        Ok(Self {
            base: caps.stream_multdiv_base()?,
        })
    }

    /// Write the coefficient numerator. The denominator is fixed at 400 in
    /// the RTL.
    #[allow(clippy::cast_sign_loss)]
    pub fn set_coefficient(&self, bus: &mut impl FabricBus, value: i32) {
        bus.write_word(self.base, multdiv::COEFFICIENT, value as u32);
        tracing::debug!("stream coefficient <- {value}");
    }

    /// Toggle passthrough mode.
    pub fn set_bypass(&self, bus: &mut impl FabricBus, enabled: bool) {
        bus.write_word(self.base, multdiv::BYPASS, u32::from(enabled));
        tracing::debug!("stream bypass <- {enabled}");
    }

    /// Read back the unit's state and counters.
    #[allow(clippy::cast_possible_wrap)]
    pub fn read_diagnostics(&self, bus: &impl FabricBus) -> StreamDiagnostics {
        StreamDiagnostics {
            coefficient: bus.read_word(self.base, multdiv::COEFFICIENT) as i32,
            bypass: bus.read_word(self.base, multdiv::BYPASS) & 1 != 0,
            valid_count: bus.read_word(self.base, multdiv::VALID_COUNT),
            last_input: bus.read_word(self.base, multdiv::LAST_INPUT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::sim::SimFabric;
    use crate::error::SgdmaError;

    #[test]
    fn coefficient_echoes_back() {
        let caps = FabricCapabilities::standard();
        let mut bus = SimFabric::new();
        let sp = StreamProcessor::open(&caps).unwrap();

        sp.set_coefficient(&mut bus, 800);
        sp.set_bypass(&mut bus, false);

        let diag = sp.read_diagnostics(&bus);
        assert_eq!(diag.coefficient, 800);
        assert!(!diag.bypass);
        assert_eq!(diag.valid_count, 0);
    }

    #[test]
    fn absent_unit_is_a_capability_gap() {
        let caps = FabricCapabilities::without_stream_processor();
        assert!(matches!(
            StreamProcessor::open(&caps).unwrap_err(),
            SgdmaError::StreamProcessorAbsent
        ));
    }
}
