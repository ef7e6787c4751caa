//! Validation and benchmark harness for a scatter-gather DMA engine with an
//! attached stream-multdiv arithmetic unit.
//!
//! The fabric under test pairs mSGDMA dispatchers with a streaming
//! processor that computes `out = in * coefficient / 400` in flight. This
//! crate drives the verification protocol: build a descriptor, flush the
//! CPU cache so the dispatcher sees committed data, launch sink-then-source,
//! spin on the sink's busy bit, and compare the destination against an
//! independently computed expectation with a ±1 rounding tolerance.
//!
//! # Backend hierarchy
//!
//! ```text
//! Hardware:
//!   DevMemFabric — /dev/mem mapping of the fabric bridge window
//!
//! Development / CI:
//!   SimFabric    — behavioral model of the whole fabric, no hardware
//! ```
//!
//! # Quick start
//!
//! ```
//! use sgdma_driver::{DataPattern, FabricCapabilities, Harness, HostTimebase, SimFabric};
//!
//! # fn main() -> sgdma_driver::Result<()> {
//! let caps = FabricCapabilities::standard();
//! let timebase = HostTimebase::probe()?;
//! let mut harness = Harness::new(SimFabric::new(), caps, timebase);
//!
//! harness.sanity_check()?;
//! let report = harness.copy_phase(DataPattern::Offset(400))?;
//! assert_eq!(report.verification.mismatch_count, 0);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod backends;
mod bus;
mod capabilities;
mod coherence;
mod dispatcher;
mod error;
mod harness;
mod stream;
mod timebase;
mod verify;

pub use backends::devmem::DevMemFabric;
pub use backends::sim::SimFabric;
pub use bus::FabricBus;
pub use capabilities::{DispatcherEntry, FabricCapabilities};
pub use coherence::flush_range;
pub use dispatcher::Dispatcher;
pub use error::{Result, SgdmaError};
pub use harness::{CopyReport, DataPattern, Harness, StreamConfig, StreamReport};
pub use stream::{StreamDiagnostics, StreamProcessor};
pub use timebase::{ticks_to_us, HostTimebase, ManualTimebase, Timebase};
pub use verify::{verify, Expectation, Mismatch, VerificationReport, MAX_RECORDED_MISMATCHES};
