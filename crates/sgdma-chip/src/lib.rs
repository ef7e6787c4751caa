//! Silicon model for the SG-DMA validation fabric.
//!
//! This crate has **no dependencies** and **no hardware access** — it is a
//! pure model of the synthesized system: the fabric memory map, the mSGDMA
//! dispatcher register layout, the stream-multdiv processor registers, and
//! the transfer descriptor format.
//!
//! The register layout matches the Platform Designer system the harness was
//! built against; the descriptor port follows the standard-descriptor
//! format of the modular SGDMA dispatcher.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | Fabric memory map, dispatcher CSR, stream-processor offsets |
//! | [`descriptor`] | Transfer descriptor builder (mm→mm, mm→st, st→mm) |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod descriptor;
pub mod regs;

pub use descriptor::{Descriptor, DescriptorError, Endpoint};
