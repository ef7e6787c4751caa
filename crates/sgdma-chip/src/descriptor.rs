//! Transfer descriptor builder.
//!
//! A descriptor binds one transfer's endpoints and byte length, mirroring
//! the dispatcher's standard descriptor format. Three shapes exist:
//! memory→memory, memory→stream, and stream→memory. Exactly one endpoint
//! may be a stream — the dispatcher hardware has either a read master or a
//! write master replaced by an Avalon-ST port, never both.
//!
//! Construction is pure: nothing here touches the bus. Submitting a
//! descriptor is the transfer engine's job.

use crate::regs::desc::control;

/// One endpoint of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// A concrete fabric byte address.
    Memory(u32),
    /// The dispatcher's streaming port.
    Stream,
}

/// A standard-format transfer descriptor, ready to submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    /// Source endpoint.
    pub source: Endpoint,
    /// Destination endpoint.
    pub destination: Endpoint,
    /// Transfer length in bytes. Never zero.
    pub length: u32,
    /// Descriptor control word, including the GO bit.
    pub control: u32,
}

/// Why a descriptor could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// Both endpoints were streams; a dispatcher has at most one ST port.
    BothEndpointsStream,
    /// Zero-length transfers are never issued by this harness.
    ZeroLength,
}

impl std::fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BothEndpointsStream => write!(f, "both endpoints are streams"),
            Self::ZeroLength => write!(f, "zero-length descriptor"),
        }
    }
}

impl std::error::Error for DescriptorError {}

impl Descriptor {
    /// Build a memory-to-memory descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::ZeroLength`] if `length_bytes` is zero.
    pub fn mm_to_mm(src: u32, dst: u32, length_bytes: u32) -> Result<Self, DescriptorError> {
        Self::build(Endpoint::Memory(src), Endpoint::Memory(dst), length_bytes)
    }

    /// Build a memory-to-stream descriptor (read dispatcher).
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::ZeroLength`] if `length_bytes` is zero.
    pub fn mm_to_st(src: u32, length_bytes: u32) -> Result<Self, DescriptorError> {
        Self::build(Endpoint::Memory(src), Endpoint::Stream, length_bytes)
    }

    /// Build a stream-to-memory descriptor (write dispatcher).
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::ZeroLength`] if `length_bytes` is zero.
    pub fn st_to_mm(dst: u32, length_bytes: u32) -> Result<Self, DescriptorError> {
        Self::build(Endpoint::Stream, Endpoint::Memory(dst), length_bytes)
    }

    fn build(
        source: Endpoint,
        destination: Endpoint,
        length_bytes: u32,
    ) -> Result<Self, DescriptorError> {
        if source == Endpoint::Stream && destination == Endpoint::Stream {
            return Err(DescriptorError::BothEndpointsStream);
        }
        if length_bytes == 0 {
            return Err(DescriptorError::ZeroLength);
        }
        Ok(Self {
            source,
            destination,
            length: length_bytes,
            control: control::GO,
        })
    }

    /// Value for the descriptor port's read-address field.
    pub const fn read_addr_field(&self) -> u32 {
        match self.source {
            Endpoint::Memory(addr) => addr,
            Endpoint::Stream => 0,
        }
    }

    /// Value for the descriptor port's write-address field.
    pub const fn write_addr_field(&self) -> u32 {
        match self.destination {
            Endpoint::Memory(addr) => addr,
            Endpoint::Stream => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mm_to_mm_fields() {
        let d = Descriptor::mm_to_mm(0x100, 0x1_0000, 1024).unwrap();
        assert_eq!(d.read_addr_field(), 0x100);
        assert_eq!(d.write_addr_field(), 0x1_0000);
        assert_eq!(d.length, 1024);
        assert_ne!(d.control & control::GO, 0);
    }

    #[test]
    fn stream_endpoints_zero_their_address_field() {
        let rd = Descriptor::mm_to_st(0x100, 1024).unwrap();
        assert_eq!(rd.write_addr_field(), 0);

        let wr = Descriptor::st_to_mm(0x1_0000, 1024).unwrap();
        assert_eq!(wr.read_addr_field(), 0);
    }

    #[test]
    fn rejects_double_stream() {
        let err = Descriptor::build(Endpoint::Stream, Endpoint::Stream, 1024).unwrap_err();
        assert_eq!(err, DescriptorError::BothEndpointsStream);
    }

    #[test]
    fn rejects_zero_length() {
        assert_eq!(
            Descriptor::mm_to_mm(0, 0x1_0000, 0).unwrap_err(),
            DescriptorError::ZeroLength
        );
        assert_eq!(
            Descriptor::mm_to_st(0, 0).unwrap_err(),
            DescriptorError::ZeroLength
        );
    }
}
