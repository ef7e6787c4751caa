//! Error types for harness operations.

use thiserror::Error;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, SgdmaError>;

/// Errors that can occur while driving the fabric.
///
/// A data mismatch found by verification is deliberately **not** an error:
/// it is a reported outcome (see `VerificationReport`), and the run
/// continues to the next phase.
#[derive(Debug, Error)]
pub enum SgdmaError {
    /// No dispatcher is registered under the requested logical name.
    #[error("DMA device not found: {name}")]
    DeviceNotFound {
        /// Logical name that failed to resolve.
        name: String,
    },

    /// A descriptor violated a construction precondition.
    #[error("Invalid descriptor: {reason}")]
    InvalidDescriptor {
        /// Which precondition was violated.
        reason: String,
    },

    /// The fabric was configured without a stream-multdiv processor.
    #[error("Stream processor not present in this fabric configuration")]
    StreamProcessorAbsent,

    /// A budgeted busy-wait exhausted its poll allowance.
    #[error("Dispatcher still busy after {polls} status polls")]
    Timeout {
        /// Number of polls performed before giving up.
        polls: u64,
    },

    /// The monotonic timing facility is unavailable. This is the one
    /// startup-fatal condition: without it no benchmark is meaningful.
    #[error("Timestamp facility unavailable: {reason}")]
    TimebaseUnavailable {
        /// Why the timebase could not be probed.
        reason: String,
    },

    /// I/O error while opening or mapping the fabric window.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl SgdmaError {
    /// Create a device-not-found error.
    pub fn device_not_found(name: impl Into<String>) -> Self {
        Self::DeviceNotFound { name: name.into() }
    }

    /// Create an invalid-descriptor error.
    pub fn invalid_descriptor(reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            reason: reason.into(),
        }
    }

    /// Create a timebase-unavailable error.
    pub fn timebase_unavailable(reason: impl Into<String>) -> Self {
        Self::TimebaseUnavailable {
            reason: reason.into(),
        }
    }
}

impl From<sgdma_chip::DescriptorError> for SgdmaError {
    fn from(err: sgdma_chip::DescriptorError) -> Self {
        Self::invalid_descriptor(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = SgdmaError::device_not_found("msgdma_write");
        assert_eq!(e.to_string(), "DMA device not found: msgdma_write");

        let e = SgdmaError::Timeout { polls: 1000 };
        assert!(e.to_string().contains("1000"));
    }

    #[test]
    fn descriptor_error_converts() {
        let err = sgdma_chip::Descriptor::mm_to_mm(0, 0x1_0000, 0).unwrap_err();
        let e: SgdmaError = err.into();
        assert!(matches!(e, SgdmaError::InvalidDescriptor { .. }));
    }
}
