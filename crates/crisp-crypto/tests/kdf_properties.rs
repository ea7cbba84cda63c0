//! Property tests for the two-stage KDF.

use crisp_crypto::{
    HmacStreebog256, HmacStreebog512, Kdf, KdfInfo, KuznyechikCmac, MacAlgorithm, Nmac256, Salt,
    SecretKey, SimpleMac, sequence_iv,
};
use proptest::prelude::*;

const APP: [u8; 32] = *b"CRISP messenger MAC key derivatn";
const USER: [u8; 16] = *b"alice\0\0\0\0\0\0\0\0\0\0\0";
const EXTRA: [u8; 16] = [0u8; 16];

fn info() -> KdfInfo<'static> {
    KdfInfo { application: &APP, user: &USER, additional: &EXTRA }
}

fn fetch<I: MacAlgorithm, O: MacAlgorithm>(
    master: [u8; 32],
    salt: [u8; 32],
    sequence: u64,
    len: usize,
) -> Vec<u8> {
    let mut kdf = Kdf::<I, O>::new(&SecretKey::from_array(master), &Salt::from_array(salt)).unwrap();
    let iv = sequence_iv(sequence, kdf.digest_size());
    let mut out = vec![0u8; len];
    kdf.fetch(&mut out, &iv, &info()).unwrap();
    out
}

/// Fetch twice from one instance with identical arguments.
fn fetch_twice<I: MacAlgorithm, O: MacAlgorithm>(
    master: [u8; 32],
    salt: [u8; 32],
    sequence: u64,
    len: usize,
) -> bool {
    let mut kdf = Kdf::<I, O>::new(&SecretKey::from_array(master), &Salt::from_array(salt)).unwrap();
    let iv = sequence_iv(sequence, kdf.digest_size());
    let mut first = vec![0u8; len];
    let mut second = vec![0u8; len];
    kdf.fetch(&mut first, &iv, &info()).unwrap();
    kdf.fetch(&mut second, &iv, &info()).unwrap();
    first == second && first == fetch::<I, O>(master, salt, sequence, len)
}

fn fetch_all_outer(master: [u8; 32], salt: [u8; 32], sequence: u64, len: usize) -> Vec<Vec<u8>> {
    vec![
        fetch::<Nmac256, Nmac256>(master, salt, sequence, len),
        fetch::<HmacStreebog512, HmacStreebog256>(master, salt, sequence, len),
        fetch::<Nmac256, HmacStreebog512>(master, salt, sequence, len),
        fetch::<SimpleMac, KuznyechikCmac>(master, salt, sequence, len),
    ]
}

proptest! {
    #[test]
    fn output_is_deterministic(
        master in any::<[u8; 32]>(),
        salt in any::<[u8; 32]>(),
        sequence in any::<u64>(),
        len in 1usize..200,
    ) {
        let first = fetch_all_outer(master, salt, sequence, len);
        let second = fetch_all_outer(master, salt, sequence, len);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn same_instance_repeats_output(
        master in any::<[u8; 32]>(),
        salt in any::<[u8; 32]>(),
        sequence in any::<u64>(),
        len in 1usize..200,
    ) {
        prop_assert!(fetch_twice::<Nmac256, Nmac256>(master, salt, sequence, len));
        prop_assert!(fetch_twice::<HmacStreebog512, HmacStreebog256>(master, salt, sequence, len));
        prop_assert!(fetch_twice::<SimpleMac, KuznyechikCmac>(master, salt, sequence, len));
    }

    #[test]
    fn output_has_requested_length(
        master in any::<[u8; 32]>(),
        len in 0usize..300,
    ) {
        for out in fetch_all_outer(master, [7u8; 32], 1, len) {
            prop_assert_eq!(out.len(), len);
        }
    }

    #[test]
    fn salt_changes_output(
        master in any::<[u8; 32]>(),
        salt in any::<[u8; 32]>(),
    ) {
        let mut other = salt;
        other[0] ^= 1;
        let a = fetch_all_outer(master, salt, 9, 32);
        let b = fetch_all_outer(master, other, 9, 32);
        for (x, y) in a.iter().zip(b.iter()) {
            prop_assert_ne!(x, y);
        }
    }
}

#[test]
fn shorter_request_is_prefix_only_within_first_chunk() {
    // The bit length is part of every format block, so a longer request is
    // not an extension of a shorter one.
    let short = fetch::<Nmac256, KuznyechikCmac>([1; 32], [2; 32], 3, 16);
    let long = fetch::<Nmac256, KuznyechikCmac>([1; 32], [2; 32], 3, 32);
    assert_ne!(short[..], long[..16]);
}

#[test]
fn sequence_number_separates_outputs() {
    let a = fetch::<Nmac256, Nmac256>([5; 32], [6; 32], 100, 32);
    let b = fetch::<Nmac256, Nmac256>([5; 32], [6; 32], 101, 32);
    assert_ne!(a, b);
}

#[test]
fn exact_and_partial_chunk_sizes() {
    for len in [15, 16, 17, 31, 32, 33, 63, 64, 65, 128] {
        for out in fetch_all_outer([3; 32], [4; 32], 42, len) {
            assert_eq!(out.len(), len);
            assert!(out.iter().any(|&b| b != 0));
        }
    }
}
