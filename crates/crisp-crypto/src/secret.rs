//! Fixed-size secret byte buffers.
//!
//! All key material in the crate lives in a [`SecretBuffer`], which wipes
//! itself on drop. Drop runs on every exit path, including early returns via
//! `?`, so derived keys never outlive the call that produced them.

use std::{fmt, ops::BitXorAssign};

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::CryptoError;

/// Fixed-capacity secret bytes, zeroized on drop.
///
/// Equality is constant time. `Debug` never prints the contents.
#[derive(Clone)]
pub struct SecretBuffer<const N: usize> {
    bytes: [u8; N],
}

/// 256-bit key (master key, inner key, derived per-message keys).
pub type SecretKey = SecretBuffer<32>;

impl<const N: usize> SecretBuffer<N> {
    /// Buffer of `N` zero bytes.
    #[must_use]
    pub fn zeroed() -> Self {
        Self { bytes: [0u8; N] }
    }

    /// Take ownership of an array. The caller should wipe its own copy.
    #[must_use]
    pub fn from_array(bytes: [u8; N]) -> Self {
        Self { bytes }
    }

    /// Copy a slice of exactly `N` bytes.
    ///
    /// # Errors
    ///
    /// - `CryptoError::InvalidLength` if `bytes.len() != N`
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != N {
            return Err(CryptoError::InvalidLength {
                what: "secret",
                expected: N,
                actual: bytes.len(),
            });
        }
        let mut buffer = Self::zeroed();
        buffer.bytes.copy_from_slice(bytes);
        Ok(buffer)
    }

    /// Contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Mutable contents.
    pub fn as_mut_bytes(&mut self) -> &mut [u8; N] {
        &mut self.bytes
    }

    /// Add `n` to the contents read as a big-endian integer, modulo `2^(8N)`.
    pub fn increment_be(&mut self, n: u64) {
        let mut carry = u128::from(n);
        for byte in self.bytes.iter_mut().rev() {
            if carry == 0 {
                break;
            }
            let sum = u128::from(*byte) + carry;
            *byte = sum as u8;
            carry = sum >> 8;
        }
    }
}

impl<const N: usize> Default for SecretBuffer<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const N: usize> BitXorAssign<&Self> for SecretBuffer<N> {
    fn bitxor_assign(&mut self, rhs: &Self) {
        for (byte, other) in self.bytes.iter_mut().zip(rhs.bytes.iter()) {
            *byte ^= other;
        }
    }
}

impl<const N: usize> PartialEq for SecretBuffer<N> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes[..].ct_eq(&other.bytes[..]).into()
    }
}

impl<const N: usize> Eq for SecretBuffer<N> {}

impl<const N: usize> Zeroize for SecretBuffer<N> {
    fn zeroize(&mut self) {
        self.bytes.zeroize();
    }
}

impl<const N: usize> Drop for SecretBuffer<N> {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl<const N: usize> fmt::Debug for SecretBuffer<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBuffer<{N}>([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_carries_across_bytes() {
        let mut counter = SecretBuffer::from_array([0x00, 0x00, 0xFF, 0xFF]);
        counter.increment_be(1);
        assert_eq!(counter.as_bytes(), &[0x00, 0x01, 0x00, 0x00]);

        counter.increment_be(0x0102);
        assert_eq!(counter.as_bytes(), &[0x00, 0x01, 0x01, 0x02]);
    }

    #[test]
    fn increment_wraps_at_capacity() {
        let mut counter = SecretBuffer::from_array([0xFF; 16]);
        counter.increment_be(2);
        let mut expected = [0u8; 16];
        expected[15] = 1;
        assert_eq!(counter.as_bytes(), &expected);
    }

    #[test]
    fn increment_by_large_value() {
        let mut counter = SecretBuffer::<16>::zeroed();
        counter.increment_be(u64::MAX);
        counter.increment_be(1);
        let mut expected = [0u8; 16];
        expected[7] = 1;
        assert_eq!(counter.as_bytes(), &expected);
    }

    #[test]
    fn xor_combines_bytewise() {
        let mut a = SecretBuffer::from_array([0b1100u8; 4]);
        let b = SecretBuffer::from_array([0b1010u8; 4]);
        a ^= &b;
        assert_eq!(a.as_bytes(), &[0b0110u8; 4]);
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(SecretKey::from_slice(&[1u8; 32]).is_ok());
        assert_eq!(
            SecretKey::from_slice(&[1u8; 31]),
            Err(CryptoError::InvalidLength { what: "secret", expected: 32, actual: 31 })
        );
    }

    #[test]
    fn equality_and_debug() {
        let a = SecretKey::from_array([7u8; 32]);
        assert_eq!(a, a.clone());
        assert_ne!(a, SecretKey::zeroed());
        assert_eq!(format!("{a:?}"), "SecretBuffer<32>([REDACTED])");
    }

    #[test]
    fn zeroize_clears_contents() {
        let mut key = SecretKey::from_array([0xAB; 32]);
        key.zeroize();
        assert_eq!(key.as_bytes(), &[0u8; 32]);
    }
}
