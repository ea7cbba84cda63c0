//! CRISP Cryptographic Primitives
//!
//! Building blocks for the CRISP messenger: key derivation, a counter-mode
//! DRBG, message authentication and Kuznyechik-CTR. Everything except the
//! DRBG is a pure function of its inputs. The DRBG takes its entropy from an
//! injectable [`EntropySource`] so tests can be fully deterministic.
//!
//! # Key Lifecycle
//!
//! ```text
//! Master Key (32 bytes, from key file)
//!        │  + per-message random salt
//!        ▼
//! Inner MAC (NMAC / HMAC-512 / XOR) → Inner Key
//!        │
//!        ▼
//! Outer MAC (NMAC / HMAC / CMAC) keyed by Inner Key
//!        │  + sequence number IV, application / user info
//!        ├──────────────────────┐
//!        ▼                      ▼
//!   MAC key → CMAC tag     Encryption key → Kuznyechik-CTR
//! ```
//!
//! # Security
//!
//! - Every key lives in a [`SecretBuffer`] and is wiped on drop
//! - Tag comparison is constant time
//! - DRBG failure (no entropy, request limits) surfaces as an error and is
//!   never papered over with weaker randomness

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod counter_mode;
mod drbg;
mod entropy;
mod error;
mod kdf;
pub mod mac;
mod secret;

pub use counter_mode::{KuznyechikCtr, apply_keystream};
pub use drbg::{
    BLOCK_SIZE, CtrDrbg, DEFAULT_RESEED_INTERVAL, KEY_SIZE, MAX_REQUEST_SIZE, SEED_SIZE,
};
pub use entropy::{EntropySource, OsEntropy};
pub use error::CryptoError;
pub use kdf::{INNER_KEY_SIZE, Kdf, KdfInfo, SALT_SIZE, Salt, sequence_iv};
pub use mac::{
    DigestMac, HmacStreebog256, HmacStreebog512, KuznyechikCmac, MacAlgorithm, Nmac256, SimpleMac,
};
pub use secret::{SecretBuffer, SecretKey};

/// Compare two tags in constant time.
///
/// Slices of different length compare unequal.
pub fn tags_equal(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}
