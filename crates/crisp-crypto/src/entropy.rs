//! Entropy sources feeding the DRBG.

use crate::CryptoError;

/// Source of seed material for [`CtrDrbg`](crate::CtrDrbg).
///
/// Production code uses [`OsEntropy`]. Tests inject a seeded generator so
/// every byte the DRBG emits is reproducible.
pub trait EntropySource: Send {
    /// Fill `buf` completely with fresh entropy.
    ///
    /// # Errors
    ///
    /// - `CryptoError::LackOfEntropy` if the source cannot deliver
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), CryptoError>;
}

/// Operating system entropy via `getrandom`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        getrandom::fill(buf).map_err(|e| CryptoError::LackOfEntropy(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_entropy_fills_buffer() {
        let mut a = [0u8; 48];
        let mut b = [0u8; 48];
        OsEntropy.fill(&mut a).unwrap();
        OsEntropy.fill(&mut b).unwrap();
        assert_ne!(a, b);
    }
}
