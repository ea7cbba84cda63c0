//! CTR_DRBG behaviour with a seeded entropy source.

use std::collections::HashSet;

use crisp_crypto::{CryptoError, CtrDrbg, EntropySource, MAX_REQUEST_SIZE};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

struct SeededEntropy(ChaCha20Rng);

impl SeededEntropy {
    fn new(seed: u64) -> Self {
        Self(ChaCha20Rng::seed_from_u64(seed))
    }
}

impl EntropySource for SeededEntropy {
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        self.0.fill_bytes(buf);
        Ok(())
    }
}

fn drbg(seed: u64) -> CtrDrbg<SeededEntropy> {
    CtrDrbg::with_entropy(SeededEntropy::new(seed)).unwrap()
}

#[test]
fn outputs_are_distinct() {
    let mut drbg = drbg(1);
    let mut seen = HashSet::new();
    for _ in 0..1000 {
        let mut block = [0u8; 16];
        drbg.generate(&mut block, None).unwrap();
        assert!(seen.insert(block), "DRBG repeated a block");
    }
}

#[test]
fn same_seed_reproduces_stream() {
    let mut a = drbg(77);
    let mut b = drbg(77);
    for _ in 0..10 {
        assert_eq!(a.next_u64().unwrap(), b.next_u64().unwrap());
    }

    let mut c = drbg(78);
    assert_ne!(drbg(77).next_u64().unwrap(), c.next_u64().unwrap());
}

#[test]
fn reseed_counter_tracks_requests() {
    let mut drbg = drbg(2);
    assert_eq!(drbg.reseed_counter(), 1);

    let mut out = [0u8; 10];
    for expected in 2..=5 {
        drbg.generate(&mut out, None).unwrap();
        assert_eq!(drbg.reseed_counter(), expected);
    }

    drbg.reseed(None).unwrap();
    assert_eq!(drbg.reseed_counter(), 1);
}

#[test]
fn oversized_request_is_rejected() {
    let mut drbg = drbg(3);
    let mut out = vec![0u8; MAX_REQUEST_SIZE + 1];
    assert_eq!(
        drbg.generate(&mut out, None),
        Err(CryptoError::QueryLimit { requested: MAX_REQUEST_SIZE + 1, max: MAX_REQUEST_SIZE })
    );

    let mut out = vec![0u8; MAX_REQUEST_SIZE];
    drbg.generate(&mut out, None).unwrap();
}

#[test]
fn fill_splits_large_buffers() {
    let mut drbg = drbg(4);
    let mut out = vec![0u8; MAX_REQUEST_SIZE * 2 + 5];
    drbg.fill(&mut out).unwrap();
    assert_eq!(drbg.reseed_counter(), 4);
    assert!(out[MAX_REQUEST_SIZE * 2..].iter().any(|&b| b != 0));
}

#[test]
fn exhausted_interval_without_auto_reseed_fails() {
    let mut drbg = drbg(5).with_auto_reseed(false).with_reseed_interval(3);
    let mut out = [0u8; 4];
    for _ in 0..3 {
        drbg.generate(&mut out, None).unwrap();
    }

    let err = drbg.generate(&mut out, None).unwrap_err();
    assert_eq!(err, CryptoError::ReseedRequired { requests: 3 });
    assert!(err.is_exhaustion());

    drbg.reseed(None).unwrap();
    drbg.generate(&mut out, None).unwrap();
}
