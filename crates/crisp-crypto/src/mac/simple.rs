//! XOR-accumulating MAC for the simplified inner KDF stage.
//!
//! Only sound when the master key is already uniformly random: the "tag" is
//! the key XORed with every 32-byte block of input (last block zero-padded).
//! Keyed by a 32-byte salt over a 32-byte master key it yields exactly
//! `master ^ salt`.

use zeroize::{Zeroize, Zeroizing};

use super::MacAlgorithm;
use crate::CryptoError;

const SIZE: usize = 32;

/// XOR combiner with 32-byte key, block and tag.
#[derive(Clone)]
pub struct SimpleMac {
    key: [u8; SIZE],
    accumulator: [u8; SIZE],
    block: [u8; SIZE],
    filled: usize,
}

impl SimpleMac {
    fn absorb_block(&mut self) {
        for (acc, byte) in self.accumulator.iter_mut().zip(self.block.iter()) {
            *acc ^= byte;
        }
        self.block.zeroize();
        self.filled = 0;
    }
}

impl MacAlgorithm for SimpleMac {
    const DIGEST_SIZE: usize = SIZE;

    fn new_keyed(key: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; SIZE] = key.try_into().map_err(|_| CryptoError::InvalidLength {
            what: "simple MAC key",
            expected: SIZE,
            actual: key.len(),
        })?;
        Ok(Self { key, accumulator: key, block: [0u8; SIZE], filled: 0 })
    }

    fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            if self.filled == SIZE {
                self.absorb_block();
            }
            let take = (SIZE - self.filled).min(data.len());
            self.block[self.filled..self.filled + take].copy_from_slice(&data[..take]);
            self.filled += take;
            data = &data[take..];
        }
    }

    fn finalize_reset(&mut self) -> Zeroizing<Vec<u8>> {
        // Unfilled tail of the block is already zero.
        self.absorb_block();
        let tag = Zeroizing::new(self.accumulator.to_vec());
        self.accumulator = self.key;
        tag
    }
}

impl Drop for SimpleMac {
    fn drop(&mut self) {
        self.key.zeroize();
        self.accumulator.zeroize();
        self.block.zeroize();
    }
}
