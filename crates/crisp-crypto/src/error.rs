//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors from key handling, derivation and random bit generation.
///
/// `LackOfEntropy`, `ReseedRequired` and `QueryLimit` mean the generator can
/// no longer produce output safely; callers must stop rather than retry with
/// weaker randomness.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Buffer or key has the wrong size.
    #[error("invalid {what} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// What was being sized
        what: &'static str,
        /// Required length
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// Reseed interval exhausted and automatic reseeding is disabled.
    #[error("DRBG must be reseeded after {requests} requests")]
    ReseedRequired {
        /// Requests served since the last reseed
        requests: u64,
    },

    /// The entropy source failed to produce bytes.
    #[error("entropy source unavailable: {0}")]
    LackOfEntropy(String),

    /// A single generate request asked for too many bytes.
    #[error("DRBG request of {requested} bytes exceeds limit of {max}")]
    QueryLimit {
        /// Bytes requested
        requested: usize,
        /// Per-request maximum
        max: usize,
    },
}

impl CryptoError {
    /// Returns true if the generator is unusable until fresh entropy arrives.
    ///
    /// Length errors are programming or configuration mistakes and leave the
    /// generator intact.
    pub fn is_exhaustion(&self) -> bool {
        matches!(
            self,
            Self::ReseedRequired { .. } | Self::LackOfEntropy(_) | Self::QueryLimit { .. }
        )
    }
}
