//! Kuznyechik in counter mode for payload confidentiality.
//!
//! The 128-bit counter block starts at the message sequence number (big
//! endian, zero extended) and increments by one per block. Encryption and
//! decryption are the same keystream XOR.

use cipher::{KeyIvInit, StreamCipher, generic_array::GenericArray};
use kuznyechik::Kuznyechik;

use crate::SecretKey;

/// Kuznyechik-CTR with a big-endian 128-bit counter.
pub type KuznyechikCtr = ctr::Ctr128BE<Kuznyechik>;

/// XOR `data` in place with the keystream for (`key`, `sequence`).
pub fn apply_keystream(key: &SecretKey, sequence: u64, data: &mut [u8]) {
    let iv = u128::from(sequence).to_be_bytes();
    let mut cipher = KuznyechikCtr::new(
        GenericArray::from_slice(key.as_bytes()),
        GenericArray::from_slice(&iv),
    );
    cipher.apply_keystream(data);
}

#[cfg(test)]
mod tests {
    use cipher::{BlockEncrypt, KeyInit};

    use super::*;

    #[test]
    fn key_schedules_are_wiped_on_drop() {
        fn wiped_on_drop<T: zeroize::ZeroizeOnDrop>() {}
        wiped_on_drop::<Kuznyechik>();
        wiped_on_drop::<ctr::CtrCore<Kuznyechik, ctr::flavors::Ctr128BE>>();
        wiped_on_drop::<cmac::CmacCore<Kuznyechik>>();
    }

    #[test]
    fn keystream_is_an_involution() {
        let key = SecretKey::from_array([0x42; 32]);
        let plaintext = b"counter mode payload spanning more than one block".to_vec();

        let mut data = plaintext.clone();
        apply_keystream(&key, 17, &mut data);
        assert_ne!(data, plaintext);
        apply_keystream(&key, 17, &mut data);
        assert_eq!(data, plaintext);
    }

    #[test]
    fn first_block_uses_sequence_as_counter() {
        let key = SecretKey::from_array([0x13; 32]);
        let sequence = 0x0000_1234_5678_9ABC;

        let mut data = [0u8; 32];
        apply_keystream(&key, sequence, &mut data);

        let block_cipher = Kuznyechik::new(GenericArray::from_slice(key.as_bytes()));
        let mut first = GenericArray::clone_from_slice(&u128::from(sequence).to_be_bytes());
        block_cipher.encrypt_block(&mut first);
        let mut second =
            GenericArray::clone_from_slice(&(u128::from(sequence) + 1).to_be_bytes());
        block_cipher.encrypt_block(&mut second);

        assert_eq!(&data[..16], first.as_slice());
        assert_eq!(&data[16..], second.as_slice());
    }

    #[test]
    fn different_sequences_give_different_keystreams() {
        let key = SecretKey::from_array([0x01; 32]);
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        apply_keystream(&key, 1, &mut a);
        apply_keystream(&key, 2, &mut b);
        assert_ne!(a, b);
    }
}
