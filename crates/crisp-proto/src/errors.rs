//! Protocol error types.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while building, encoding, or decoding wire structures.
///
/// Every variant is a per-message failure: the offending buffer is dropped
/// and the caller decides whether the stream is still usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer is shorter than the fixed part of a frame.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum number of bytes required
        expected: usize,
        /// Actual number of bytes available
        actual: usize,
    },

    /// Encoded frame would exceed the protocol maximum.
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Encoded size of the frame
        size: usize,
        /// Protocol maximum
        max: usize,
    },

    /// Suite byte on the wire does not name a registered suite.
    #[error("unsupported cryptographic suite id {0}")]
    UnknownSuite(u8),

    /// Suite name from configuration is not in the registry.
    #[error("unknown cryptographic suite name '{0}'")]
    UnknownSuiteName(String),

    /// Version does not fit in 15 bits.
    #[error("version {0:#06x} does not fit in 15 bits")]
    InvalidVersion(u16),

    /// Sequence number does not fit in 48 bits.
    #[error("sequence number {0:#x} does not fit in 48 bits")]
    InvalidSequence(u64),

    /// Key identifier cannot be represented on the wire.
    #[error("invalid key id: {0}")]
    InvalidKeyId(&'static str),

    /// Integrity field length does not match the suite.
    #[error("integrity field is {actual} bytes, suite requires {expected}")]
    IntegrityFieldLength {
        /// Length the suite requires
        expected: usize,
        /// Length supplied
        actual: usize,
    },

    /// Transfer info envelope is malformed.
    #[error("invalid transfer info: {0}")]
    InvalidTransferInfo(String),
}
