//! Two-stage key derivation (R 1323565.1.022-2018 style).
//!
//! ```text
//! stage 1:  inner_key = first 32 bytes of I(key = salt, data = master_key)
//! stage 2:  O keyed with inner_key, applied to successive format blocks
//!
//! format = 0xFC || counter (u64 LE) || IV (|O| bytes) || bit length (u64 LE)
//!          || application_info (32) || user_info (16) || additional_info (16)
//! ```
//!
//! Chunk `i` (0-based) of the output is `O(format)` with `counter = i + 1`.
//! The IV field of the first chunk is supplied by the caller; every later
//! chunk carries the previous chunk's tag in that field. The final chunk is
//! truncated to the requested length.
//!
//! # Security
//!
//! The instance holds no state besides the keyed outer MAC, so
//! [`Kdf::fetch`] is a pure function of its arguments. One instance may serve
//! several logical keys distinguished only by `application_info`.

use std::marker::PhantomData;

use zeroize::Zeroizing;

use crate::{CryptoError, MacAlgorithm, SecretBuffer, SecretKey};

/// Size of the inner key produced by stage one.
pub const INNER_KEY_SIZE: usize = 32;

/// Size of the salt mixed in by stage one.
pub const SALT_SIZE: usize = 32;

/// Per-call salt.
pub type Salt = SecretBuffer<SALT_SIZE>;

const FORMAT_TAG: u8 = 0xFC;

/// Fixed part of the format block (everything except the IV).
const FORMAT_OVERHEAD: usize = 1 + 8 + 8 + 32 + 16 + 16;

const COUNTER_OFFSET: usize = 1;
const IV_OFFSET: usize = COUNTER_OFFSET + 8;

/// Context strings bound into every derived block.
#[derive(Debug, Clone, Copy)]
pub struct KdfInfo<'a> {
    /// Names the purpose of the derived key.
    pub application: &'a [u8; 32],
    /// Identifies the party the key belongs to.
    pub user: &'a [u8; 16],
    /// Free-form extra context.
    pub additional: &'a [u8; 16],
}

/// Key derivation function with inner-stage MAC `I` and outer-stage MAC `O`.
pub struct Kdf<I, O> {
    outer: O,
    _inner: PhantomData<fn() -> I>,
}

impl<I: MacAlgorithm, O: MacAlgorithm> Kdf<I, O> {
    /// Run stage one and key stage two.
    ///
    /// # Errors
    ///
    /// - `CryptoError::InvalidLength` if either MAC rejects its key
    pub fn new(master_key: &SecretKey, salt: &Salt) -> Result<Self, CryptoError> {
        const { assert!(I::DIGEST_SIZE >= INNER_KEY_SIZE, "inner MAC digest too short") };

        let mut inner = I::new_keyed(salt.as_bytes())?;
        inner.update(master_key.as_bytes());
        let digest = inner.finalize_reset();
        let inner_key = SecretKey::from_slice(&digest[..INNER_KEY_SIZE])?;

        Ok(Self { outer: O::new_keyed(inner_key.as_bytes())?, _inner: PhantomData })
    }

    /// Size of one output chunk and of the IV.
    pub fn digest_size(&self) -> usize {
        O::DIGEST_SIZE
    }

    /// Fill `out` with key material.
    ///
    /// # Errors
    ///
    /// - `CryptoError::InvalidLength` if `iv` is not exactly
    ///   [`digest_size`](Self::digest_size) bytes
    pub fn fetch(&mut self, out: &mut [u8], iv: &[u8], info: &KdfInfo<'_>) -> Result<(), CryptoError> {
        let digest_size = O::DIGEST_SIZE;
        if iv.len() != digest_size {
            return Err(CryptoError::InvalidLength {
                what: "KDF IV",
                expected: digest_size,
                actual: iv.len(),
            });
        }

        let mut format = Zeroizing::new(Vec::with_capacity(digest_size + FORMAT_OVERHEAD));
        format.push(FORMAT_TAG);
        format.extend_from_slice(&1u64.to_le_bytes());
        format.extend_from_slice(iv);
        format.extend_from_slice(&(out.len() as u64).wrapping_mul(8).to_le_bytes());
        format.extend_from_slice(info.application);
        format.extend_from_slice(info.user);
        format.extend_from_slice(info.additional);
        debug_assert_eq!(format.len(), digest_size + FORMAT_OVERHEAD);

        let iv_range = IV_OFFSET..IV_OFFSET + digest_size;
        for (index, chunk) in out.chunks_mut(digest_size).enumerate() {
            let counter = index as u64 + 1;
            format[COUNTER_OFFSET..IV_OFFSET].copy_from_slice(&counter.to_le_bytes());

            self.outer.update(&format);
            let digest = self.outer.finalize_reset();
            chunk.copy_from_slice(&digest[..chunk.len()]);
            format[iv_range.clone()].copy_from_slice(&digest);
        }

        Ok(())
    }

    /// Derive one 256-bit key.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub fn derive_key(&mut self, iv: &[u8], info: &KdfInfo<'_>) -> Result<SecretKey, CryptoError> {
        let mut key = SecretKey::zeroed();
        self.fetch(key.as_mut_bytes(), iv, info)?;
        Ok(key)
    }
}

/// Encode a sequence number as a KDF IV of `size` bytes.
///
/// The number is written big endian and right aligned; shorter IVs keep the
/// low-order bytes.
pub fn sequence_iv(sequence: u64, size: usize) -> Vec<u8> {
    let bytes = sequence.to_be_bytes();
    let mut iv = vec![0u8; size];
    let take = size.min(bytes.len());
    iv[size - take..].copy_from_slice(&bytes[bytes.len() - take..]);
    iv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KuznyechikCmac, Nmac256, SimpleMac};

    const APP: [u8; 32] = [0xA1; 32];
    const USER: [u8; 16] = [0xB2; 16];
    const EXTRA: [u8; 16] = [0u8; 16];

    fn info() -> KdfInfo<'static> {
        KdfInfo { application: &APP, user: &USER, additional: &EXTRA }
    }

    #[test]
    fn first_chunk_is_outer_mac_of_format_block() {
        let master = SecretKey::from_array([3u8; 32]);
        let salt = Salt::from_array([4u8; 32]);
        let iv = sequence_iv(77, 16);

        let mut kdf = Kdf::<SimpleMac, KuznyechikCmac>::new(&master, &salt).unwrap();
        let mut out = [0u8; 16];
        kdf.fetch(&mut out, &iv, &info()).unwrap();

        // SimpleMac over equal-length master and salt is their XOR.
        let inner_key = [3u8 ^ 4u8; 32];
        let mut format = vec![0xFC];
        format.extend_from_slice(&1u64.to_le_bytes());
        format.extend_from_slice(&iv);
        format.extend_from_slice(&128u64.to_le_bytes());
        format.extend_from_slice(&APP);
        format.extend_from_slice(&USER);
        format.extend_from_slice(&EXTRA);
        let expected = KuznyechikCmac::compute(&inner_key, &format).unwrap();

        assert_eq!(&out[..], &expected[..]);
    }

    #[test]
    fn second_chunk_chains_previous_tag() {
        let master = SecretKey::from_array([1u8; 32]);
        let salt = Salt::from_array([2u8; 32]);
        let iv = sequence_iv(5, 16);

        let mut kdf = Kdf::<SimpleMac, KuznyechikCmac>::new(&master, &salt).unwrap();
        let mut out = [0u8; 20];
        kdf.fetch(&mut out, &iv, &info()).unwrap();

        let inner_key = [1u8 ^ 2u8; 32];
        let mut format = vec![0xFC];
        format.extend_from_slice(&2u64.to_le_bytes());
        format.extend_from_slice(&out[..16]);
        format.extend_from_slice(&160u64.to_le_bytes());
        format.extend_from_slice(&APP);
        format.extend_from_slice(&USER);
        format.extend_from_slice(&EXTRA);
        let second = KuznyechikCmac::compute(&inner_key, &format).unwrap();

        assert_eq!(&out[16..], &second[..4]);
    }

    #[test]
    fn rejects_iv_of_wrong_size() {
        let master = SecretKey::from_array([1u8; 32]);
        let salt = Salt::from_array([2u8; 32]);
        let mut kdf = Kdf::<Nmac256, Nmac256>::new(&master, &salt).unwrap();

        let mut out = [0u8; 32];
        let err = kdf.fetch(&mut out, &[0u8; 16], &info()).unwrap_err();
        assert_eq!(err, CryptoError::InvalidLength { what: "KDF IV", expected: 32, actual: 16 });
    }

    #[test]
    fn application_info_separates_keys() {
        let master = SecretKey::from_array([8u8; 32]);
        let salt = Salt::from_array([9u8; 32]);
        let iv = sequence_iv(1, 32);
        let mut kdf = Kdf::<Nmac256, Nmac256>::new(&master, &salt).unwrap();

        let other_app = [0xC3u8; 32];
        let a = kdf.derive_key(&iv, &info()).unwrap();
        let b = kdf
            .derive_key(&iv, &KdfInfo { application: &other_app, ..info() })
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn sequence_iv_layout() {
        assert_eq!(sequence_iv(0x0102, 4), vec![0, 0, 1, 2]);
        assert_eq!(sequence_iv(0x0102_0304_0506, 16)[10..], [1u8, 2, 3, 4, 5, 6]);
        assert_eq!(sequence_iv(u64::MAX, 32)[..24], [0u8; 24]);
        assert_eq!(sequence_iv(0x0102_0304_0506_0708, 2), vec![7, 8]);
    }
}
