//! Adapter from RustCrypto `digest::Mac` implementations.

use cmac::Cmac;
use digest::{
    FixedOutputReset, KeyInit, Mac, OutputSizeUser, crypto_common::KeySizeUser, typenum::Unsigned,
};
use hmac::Hmac;
use kuznyechik::Kuznyechik;
use streebog::{Streebog256, Streebog512};
use zeroize::Zeroizing;

use super::MacAlgorithm;
use crate::CryptoError;

/// Any RustCrypto MAC viewed as a [`MacAlgorithm`].
#[derive(Clone)]
pub struct DigestMac<M>(M);

/// HMAC over Streebog-256, 32-byte tags.
pub type HmacStreebog256 = DigestMac<Hmac<Streebog256>>;

/// HMAC over Streebog-512, 64-byte tags.
pub type HmacStreebog512 = DigestMac<Hmac<Streebog512>>;

/// Kuznyechik OMAC (CMAC), 16-byte tags, 32-byte keys.
pub type KuznyechikCmac = DigestMac<Cmac<Kuznyechik>>;

impl<M> MacAlgorithm for DigestMac<M>
where
    M: Mac + KeyInit + FixedOutputReset,
{
    const DIGEST_SIZE: usize = <<M as OutputSizeUser>::OutputSize as Unsigned>::USIZE;

    fn new_keyed(key: &[u8]) -> Result<Self, CryptoError> {
        <M as Mac>::new_from_slice(key).map(Self).map_err(|_| CryptoError::InvalidLength {
            what: "MAC key",
            expected: <M as KeySizeUser>::key_size(),
            actual: key.len(),
        })
    }

    fn update(&mut self, data: &[u8]) {
        Mac::update(&mut self.0, data);
    }

    fn finalize_reset(&mut self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(Mac::finalize_reset(&mut self.0).into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_sizes() {
        assert_eq!(HmacStreebog256::DIGEST_SIZE, 32);
        assert_eq!(HmacStreebog512::DIGEST_SIZE, 64);
        assert_eq!(KuznyechikCmac::DIGEST_SIZE, 16);
    }

    #[test]
    fn hmac_matches_underlying_crate() {
        let key = [0x0Bu8; 32];
        let ours = HmacStreebog256::compute(&key, b"message").unwrap();

        let mut theirs = <Hmac<Streebog256> as Mac>::new_from_slice(&key).unwrap();
        Mac::update(&mut theirs, b"message");
        assert_eq!(&ours[..], &theirs.finalize().into_bytes()[..]);
    }

    #[test]
    fn cmac_rejects_short_key() {
        let err = KuznyechikCmac::new_keyed(&[0u8; 16]).err();
        assert_eq!(
            err,
            Some(CryptoError::InvalidLength { what: "MAC key", expected: 32, actual: 16 })
        );
    }

    #[test]
    fn cmac_matches_gost_34_13_example() {
        let key = [
            0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55,
            0x66, 0x77, 0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54, 0x32, 0x10, 0x01, 0x23, 0x45, 0x67,
            0x89, 0xab, 0xcd, 0xef,
        ];
        let message = [
            0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x00, 0xff, 0xee, 0xdd, 0xcc, 0xbb, 0xaa,
            0x99, 0x88, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb,
            0xcc, 0xee, 0xff, 0x0a, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa,
            0xbb, 0xcc, 0xee, 0xff, 0x0a, 0x00, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99,
            0xaa, 0xbb, 0xcc, 0xee, 0xff, 0x0a, 0x00, 0x11,
        ];

        let tag = KuznyechikCmac::compute(&key, &message).unwrap();
        assert_eq!(&tag[..8], &[0x33, 0x6f, 0x4d, 0x29, 0x60, 0x59, 0xfb, 0xe3]);
    }

    #[test]
    fn finalize_resets_to_keyed_state() {
        let mut mac = KuznyechikCmac::new_keyed(&[5u8; 32]).unwrap();
        mac.update(b"first");
        let first = mac.finalize_reset();
        mac.update(b"first");
        assert_eq!(mac.finalize_reset(), first);
    }
}
