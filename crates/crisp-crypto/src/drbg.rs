//! CTR_DRBG over Kuznyechik (NIST SP 800-90A structure, no derivation
//! function).
//!
//! ```text
//! state:  key (32) || counter V (16)
//!
//! update(seed):
//!     temp = E(key, ++V) || E(key, ++V) || E(key, ++V)    48 bytes
//!     temp ^= seed
//!     key, V = temp[..32], temp[32..]
//!
//! generate(n, additional):
//!     if additional: seed = pad48(additional); update(seed)
//!     out = E(key, ++V) || E(key, ++V) || ...  truncated to n
//!     update(seed)                      seed is all zero without additional
//! ```
//!
//! A fresh generator starts from a zero key and zero counter and immediately
//! reseeds with OS entropy and a fixed personalization string.

use cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};
use kuznyechik::Kuznyechik;
use tracing::debug;
use zeroize::Zeroize;

use crate::{CryptoError, EntropySource, OsEntropy, SecretBuffer};

/// Kuznyechik block size.
pub const BLOCK_SIZE: usize = 16;

/// Kuznyechik key size.
pub const KEY_SIZE: usize = 32;

/// Seed length: key plus counter.
pub const SEED_SIZE: usize = KEY_SIZE + BLOCK_SIZE;

/// Largest single [`CtrDrbg::generate`] request in bytes.
pub const MAX_REQUEST_SIZE: usize = 1 << 16;

/// Requests served between reseeds.
pub const DEFAULT_RESEED_INTERVAL: u64 = 1 << 48;

const PERSONALIZATION: &[u8] = b"CRISPMessenger";

type Seed = SecretBuffer<SEED_SIZE>;

/// Deterministic random bit generator based on Kuznyechik in counter mode.
pub struct CtrDrbg<E: EntropySource = OsEntropy> {
    cipher: Kuznyechik,
    counter: SecretBuffer<BLOCK_SIZE>,
    reseed_counter: u64,
    reseed_interval: u64,
    auto_reseed: bool,
    entropy: E,
}

impl CtrDrbg<OsEntropy> {
    /// Instantiate from operating system entropy.
    ///
    /// # Errors
    ///
    /// - `CryptoError::LackOfEntropy` if the OS source fails
    pub fn new() -> Result<Self, CryptoError> {
        Self::with_entropy(OsEntropy)
    }
}

impl<E: EntropySource> CtrDrbg<E> {
    /// Instantiate from a caller-provided entropy source.
    ///
    /// # Errors
    ///
    /// - `CryptoError::LackOfEntropy` if the source fails
    pub fn with_entropy(entropy: E) -> Result<Self, CryptoError> {
        let zero_key = SecretBuffer::<KEY_SIZE>::zeroed();
        let mut drbg = Self {
            cipher: Kuznyechik::new(GenericArray::from_slice(zero_key.as_bytes())),
            counter: SecretBuffer::zeroed(),
            reseed_counter: 0,
            reseed_interval: DEFAULT_RESEED_INTERVAL,
            auto_reseed: true,
            entropy,
        };
        drbg.reseed(Some(PERSONALIZATION))?;
        Ok(drbg)
    }

    /// Enable or disable reseeding when the interval runs out.
    #[must_use]
    pub fn with_auto_reseed(mut self, enabled: bool) -> Self {
        self.auto_reseed = enabled;
        self
    }

    /// Set the number of requests allowed between reseeds.
    #[must_use]
    pub fn with_reseed_interval(mut self, interval: u64) -> Self {
        self.reseed_interval = interval;
        self
    }

    /// Requests served since the last reseed, plus one.
    pub fn reseed_counter(&self) -> u64 {
        self.reseed_counter
    }

    /// Mix fresh entropy and optional additional input into the state.
    ///
    /// Additional input longer than the seed length is truncated.
    ///
    /// # Errors
    ///
    /// - `CryptoError::LackOfEntropy` if the entropy source fails
    pub fn reseed(&mut self, additional: Option<&[u8]>) -> Result<(), CryptoError> {
        let mut seed = Self::seed_from(additional);
        let mut entropy = Seed::zeroed();
        self.entropy.fill(entropy.as_mut_bytes())?;
        seed ^= &entropy;

        self.update(&seed);
        self.reseed_counter = 1;
        debug!("DRBG reseeded");
        Ok(())
    }

    /// Fill `out` with pseudorandom bytes.
    ///
    /// # Errors
    ///
    /// - `CryptoError::QueryLimit` if `out` exceeds [`MAX_REQUEST_SIZE`]
    /// - `CryptoError::ReseedRequired` if the interval ran out and automatic
    ///   reseeding is off
    /// - `CryptoError::LackOfEntropy` if an automatic reseed fails
    pub fn generate(&mut self, out: &mut [u8], additional: Option<&[u8]>) -> Result<(), CryptoError> {
        if out.len() > MAX_REQUEST_SIZE {
            return Err(CryptoError::QueryLimit { requested: out.len(), max: MAX_REQUEST_SIZE });
        }

        let mut additional = additional;
        if self.reseed_counter > self.reseed_interval {
            if !self.auto_reseed {
                return Err(CryptoError::ReseedRequired { requests: self.reseed_counter - 1 });
            }
            // Reseed absorbs the additional input.
            self.reseed(additional.take())?;
        }

        let seed = Self::seed_from(additional);
        if additional.is_some() {
            self.update(&seed);
        }

        for chunk in out.chunks_mut(BLOCK_SIZE) {
            let block = self.next_block();
            chunk.copy_from_slice(&block.as_bytes()[..chunk.len()]);
        }

        self.update(&seed);
        self.reseed_counter += 1;
        Ok(())
    }

    /// Fill a buffer of any length, splitting it into maximal requests.
    ///
    /// # Errors
    ///
    /// Same as [`generate`](Self::generate), except `QueryLimit`.
    pub fn fill(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        for chunk in out.chunks_mut(MAX_REQUEST_SIZE) {
            self.generate(chunk, None)?;
        }
        Ok(())
    }

    /// Draw a uniformly distributed `u64`.
    ///
    /// # Errors
    ///
    /// Same as [`generate`](Self::generate).
    pub fn next_u64(&mut self) -> Result<u64, CryptoError> {
        let mut bytes = [0u8; 8];
        self.generate(&mut bytes, None)?;
        Ok(u64::from_be_bytes(bytes))
    }

    fn seed_from(additional: Option<&[u8]>) -> Seed {
        let mut seed = Seed::zeroed();
        if let Some(input) = additional {
            let len = input.len().min(SEED_SIZE);
            seed.as_mut_bytes()[..len].copy_from_slice(&input[..len]);
        }
        seed
    }

    fn next_block(&mut self) -> SecretBuffer<BLOCK_SIZE> {
        self.counter.increment_be(1);
        let mut block = GenericArray::clone_from_slice(self.counter.as_bytes());
        self.cipher.encrypt_block(&mut block);
        let mut out = SecretBuffer::<BLOCK_SIZE>::zeroed();
        out.as_mut_bytes().copy_from_slice(&block);
        block.as_mut_slice().zeroize();
        out
    }

    fn update(&mut self, seed: &Seed) {
        let mut temp = Seed::zeroed();
        for chunk in temp.as_mut_bytes().chunks_mut(BLOCK_SIZE) {
            chunk.copy_from_slice(self.next_block().as_bytes());
        }
        temp ^= seed;

        let (key, counter) = temp.as_bytes().split_at(KEY_SIZE);
        self.cipher = Kuznyechik::new(GenericArray::from_slice(key));
        self.counter.as_mut_bytes().copy_from_slice(counter);
    }
}

impl<E: EntropySource> std::fmt::Debug for CtrDrbg<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CtrDrbg")
            .field("reseed_counter", &self.reseed_counter)
            .field("reseed_interval", &self.reseed_interval)
            .field("auto_reseed", &self.auto_reseed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns the same byte forever.
    struct Constant(u8);

    impl EntropySource for Constant {
        fn fill(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
            buf.fill(self.0);
            Ok(())
        }
    }

    struct Broken;

    impl EntropySource for Broken {
        fn fill(&mut self, _buf: &mut [u8]) -> Result<(), CryptoError> {
            Err(CryptoError::LackOfEntropy("unplugged".into()))
        }
    }

    #[test]
    fn same_entropy_same_output() {
        let mut a = CtrDrbg::with_entropy(Constant(9)).unwrap();
        let mut b = CtrDrbg::with_entropy(Constant(9)).unwrap();

        let mut x = [0u8; 100];
        let mut y = [0u8; 100];
        a.generate(&mut x, None).unwrap();
        b.generate(&mut y, None).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn additional_input_changes_output() {
        let mut a = CtrDrbg::with_entropy(Constant(9)).unwrap();
        let mut b = CtrDrbg::with_entropy(Constant(9)).unwrap();

        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        a.generate(&mut x, None).unwrap();
        b.generate(&mut y, Some(b"nonce")).unwrap();
        assert_ne!(x, y);
    }

    #[test]
    fn consecutive_outputs_differ() {
        let mut drbg = CtrDrbg::with_entropy(Constant(1)).unwrap();
        let mut x = [0u8; 16];
        let mut y = [0u8; 16];
        drbg.generate(&mut x, None).unwrap();
        drbg.generate(&mut y, None).unwrap();
        assert_ne!(x, y);
    }

    #[test]
    fn broken_source_fails_instantiation() {
        let err = CtrDrbg::with_entropy(Broken).unwrap_err();
        assert!(err.is_exhaustion());
    }

    #[test]
    fn auto_reseed_pulls_entropy() {
        let mut drbg = CtrDrbg::with_entropy(Constant(2)).unwrap().with_reseed_interval(2);
        let mut out = [0u8; 8];
        drbg.generate(&mut out, None).unwrap();
        drbg.generate(&mut out, None).unwrap();
        assert_eq!(drbg.reseed_counter(), 3);

        drbg.generate(&mut out, None).unwrap();
        assert_eq!(drbg.reseed_counter(), 2);
    }

    #[test]
    fn partial_block_request() {
        let mut drbg = CtrDrbg::with_entropy(Constant(3)).unwrap();
        let mut out = [0u8; 5];
        drbg.generate(&mut out, None).unwrap();
        assert_ne!(out, [0u8; 5]);
    }
}
