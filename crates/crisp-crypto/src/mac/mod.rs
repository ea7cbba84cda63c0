//! MAC constructions used by the KDF and for message tags.
//!
//! Every construction is reached through [`MacAlgorithm`], so the KDF and the
//! channel pipelines are generic over the concrete MAC and are monomorphised
//! once per suite.

mod digest_mac;
mod nmac;
mod simple;

pub use digest_mac::{DigestMac, HmacStreebog256, HmacStreebog512, KuznyechikCmac};
pub use nmac::Nmac256;
pub use simple::SimpleMac;
use zeroize::Zeroizing;

use crate::CryptoError;

/// Keyed MAC capability.
///
/// A value is created in its keyed state, absorbs data with
/// [`update`](Self::update), and returns to the keyed state after every
/// [`finalize_reset`](Self::finalize_reset), so one instance can authenticate
/// many messages under the same key.
pub trait MacAlgorithm: Sized {
    /// Length of the tag produced by [`finalize_reset`](Self::finalize_reset).
    const DIGEST_SIZE: usize;

    /// Create an instance keyed with `key`.
    ///
    /// # Errors
    ///
    /// - `CryptoError::InvalidLength` if the construction does not accept a
    ///   key of this length
    fn new_keyed(key: &[u8]) -> Result<Self, CryptoError>;

    /// Absorb more data.
    fn update(&mut self, data: &[u8]);

    /// Produce the tag over everything absorbed since the last reset and
    /// return to the freshly keyed state.
    fn finalize_reset(&mut self) -> Zeroizing<Vec<u8>>;

    /// One-shot tag over `data`.
    ///
    /// # Errors
    ///
    /// Same as [`new_keyed`](Self::new_keyed).
    fn compute(key: &[u8], data: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let mut mac = Self::new_keyed(key)?;
        mac.update(data);
        Ok(mac.finalize_reset())
    }
}
