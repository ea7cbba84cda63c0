//! NMAC-256 as defined in R 1323565.1.022-2018.
//!
//! ```text
//! K'   = key zero-padded to 64 bytes (Streebog-512(key) if longer)
//! NMAC = Streebog-256((K' ^ opad) || Streebog-512((K' ^ ipad) || data))
//! ```

use streebog::{Digest, Streebog256, Streebog512};
use zeroize::{Zeroize, Zeroizing};

use super::MacAlgorithm;
use crate::CryptoError;

const BLOCK_SIZE: usize = 64;
const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// Nested MAC over Streebog, 32-byte tags, keys of any length.
#[derive(Clone)]
pub struct Nmac256 {
    /// `K'`, absorbed again on every reset.
    key: Zeroizing<[u8; BLOCK_SIZE]>,
    /// Inner hash absorbing the current message.
    inner: Streebog512,
}

impl Nmac256 {
    fn keyed_inner(&self) -> Streebog512 {
        let inner_key = Zeroizing::new(self.key.map(|byte| byte ^ IPAD));
        let mut inner = Streebog512::new();
        inner.update(&*inner_key);
        inner
    }
}

impl MacAlgorithm for Nmac256 {
    const DIGEST_SIZE: usize = 32;

    fn new_keyed(key: &[u8]) -> Result<Self, CryptoError> {
        let mut padded = Zeroizing::new([0u8; BLOCK_SIZE]);
        if key.len() > BLOCK_SIZE {
            let mut hashed = Streebog512::digest(key);
            padded.copy_from_slice(&hashed);
            hashed.as_mut_slice().zeroize();
        } else {
            padded[..key.len()].copy_from_slice(key);
        }

        let mut mac = Self { key: padded, inner: Streebog512::new() };
        mac.inner = mac.keyed_inner();
        Ok(mac)
    }

    fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    fn finalize_reset(&mut self) -> Zeroizing<Vec<u8>> {
        let fresh = self.keyed_inner();
        let inner = std::mem::replace(&mut self.inner, fresh);
        let mut inner_digest = inner.finalize();

        let outer_key = Zeroizing::new(self.key.map(|byte| byte ^ OPAD));
        let mut outer = Streebog256::new();
        outer.update(&*outer_key);
        outer.update(inner_digest);
        inner_digest.as_mut_slice().zeroize();

        Zeroizing::new(outer.finalize().to_vec())
    }
}

impl Drop for Nmac256 {
    fn drop(&mut self) {
        // Overwrite the chaining value derived from `K' ^ ipad`.
        Digest::reset(&mut self.inner);
    }
}
