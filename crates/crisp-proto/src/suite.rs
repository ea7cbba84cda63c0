//! Cryptographic suite registry.
//!
//! A suite fixes three independent choices: whether payloads are encrypted,
//! which MAC combines the master key with the per-message salt (KDF stage
//! one), and which MAC expands the resulting inner key (KDF stage two). The
//! catalogue is closed; suites are addressed by a one-byte id on the wire and
//! by name in configuration.
//!
//! ```text
//! id = confidentiality * 12 + inner * 4 + outer
//!
//! confidentiality: NULL | KuznechikCTR
//! inner:           NMAC | HMAC | Simple
//! outer:           NMAC | HMAC256 | HMAC512 | CMAC
//! ```

use std::{fmt, str::FromStr};

use crate::errors::ProtocolError;

/// Length of the per-message salt carried at the start of the integrity field.
pub const SALT_SIZE: usize = 32;

/// Length of the authentication tag that follows the salt.
pub const TAG_SIZE: usize = 16;

/// Payload protection applied by a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Confidentiality {
    /// Payload travels in the clear, authenticated only.
    None,
    /// Payload is encrypted with Kuznyechik in counter mode, then authenticated.
    KuznyechikCtr,
}

/// First KDF stage: combines master key and salt into an inner key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InnerStage {
    /// NMAC over Streebog, keyed by the salt.
    Nmac,
    /// HMAC-Streebog-512 keyed by the salt, truncated to 32 bytes.
    Hmac,
    /// XOR of equal-length master key and salt.
    Simple,
}

/// Second KDF stage: expands the inner key into key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OuterStage {
    /// NMAC over Streebog (32-byte blocks).
    Nmac,
    /// HMAC-Streebog-256 (32-byte blocks).
    Hmac256,
    /// HMAC-Streebog-512 (64-byte blocks).
    Hmac512,
    /// Kuznyechik CMAC (16-byte blocks).
    Cmac,
}

/// Identifier of a registered cryptographic suite.
///
/// The discriminant is the byte carried in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum SuiteId {
    NullNmacNmac = 0,
    NullNmacHmac256,
    NullNmacHmac512,
    NullNmacCmac,
    NullHmacNmac,
    NullHmacHmac256,
    NullHmacHmac512,
    NullHmacCmac,
    NullSimpleNmac,
    NullSimpleHmac256,
    NullSimpleHmac512,
    NullSimpleCmac,
    CtrNmacNmac,
    CtrNmacHmac256,
    CtrNmacHmac512,
    CtrNmacCmac,
    CtrHmacNmac,
    CtrHmacHmac256,
    CtrHmacHmac512,
    CtrHmacCmac,
    CtrSimpleNmac,
    CtrSimpleHmac256,
    CtrSimpleHmac512,
    CtrSimpleCmac,
}

const NAMES: [&str; 24] = [
    "NULL_KuznechikCMAC_256_128_R13235651022_NMAC_NMAC",
    "NULL_KuznechikCMAC_256_128_R13235651022_NMAC_HMAC256",
    "NULL_KuznechikCMAC_256_128_R13235651022_NMAC_HMAC512",
    "NULL_KuznechikCMAC_256_128_R13235651022_NMAC_CMAC",
    "NULL_KuznechikCMAC_256_128_R13235651022_HMAC_NMAC",
    "NULL_KuznechikCMAC_256_128_R13235651022_HMAC_HMAC256",
    "NULL_KuznechikCMAC_256_128_R13235651022_HMAC_HMAC512",
    "NULL_KuznechikCMAC_256_128_R13235651022_HMAC_CMAC",
    "NULL_KuznechikCMAC_256_128_R13235651022_Simple_NMAC",
    "NULL_KuznechikCMAC_256_128_R13235651022_Simple_HMAC256",
    "NULL_KuznechikCMAC_256_128_R13235651022_Simple_HMAC512",
    "NULL_KuznechikCMAC_256_128_R13235651022_Simple_CMAC",
    "KuznechikCTR_KuznechikCMAC_256_128_R13235651022_NMAC_NMAC",
    "KuznechikCTR_KuznechikCMAC_256_128_R13235651022_NMAC_HMAC256",
    "KuznechikCTR_KuznechikCMAC_256_128_R13235651022_NMAC_HMAC512",
    "KuznechikCTR_KuznechikCMAC_256_128_R13235651022_NMAC_CMAC",
    "KuznechikCTR_KuznechikCMAC_256_128_R13235651022_HMAC_NMAC",
    "KuznechikCTR_KuznechikCMAC_256_128_R13235651022_HMAC_HMAC256",
    "KuznechikCTR_KuznechikCMAC_256_128_R13235651022_HMAC_HMAC512",
    "KuznechikCTR_KuznechikCMAC_256_128_R13235651022_HMAC_CMAC",
    "KuznechikCTR_KuznechikCMAC_256_128_R13235651022_Simple_NMAC",
    "KuznechikCTR_KuznechikCMAC_256_128_R13235651022_Simple_HMAC256",
    "KuznechikCTR_KuznechikCMAC_256_128_R13235651022_Simple_HMAC512",
    "KuznechikCTR_KuznechikCMAC_256_128_R13235651022_Simple_CMAC",
];

impl SuiteId {
    /// Every registered suite, in id order.
    pub const ALL: [Self; 24] = [
        Self::NullNmacNmac,
        Self::NullNmacHmac256,
        Self::NullNmacHmac512,
        Self::NullNmacCmac,
        Self::NullHmacNmac,
        Self::NullHmacHmac256,
        Self::NullHmacHmac512,
        Self::NullHmacCmac,
        Self::NullSimpleNmac,
        Self::NullSimpleHmac256,
        Self::NullSimpleHmac512,
        Self::NullSimpleCmac,
        Self::CtrNmacNmac,
        Self::CtrNmacHmac256,
        Self::CtrNmacHmac512,
        Self::CtrNmacCmac,
        Self::CtrHmacNmac,
        Self::CtrHmacHmac256,
        Self::CtrHmacHmac512,
        Self::CtrHmacCmac,
        Self::CtrSimpleNmac,
        Self::CtrSimpleHmac256,
        Self::CtrSimpleHmac512,
        Self::CtrSimpleCmac,
    ];

    /// Suite used when configuration does not name one.
    pub const DEFAULT: Self = Self::CtrNmacCmac;

    /// Wire byte for this suite.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Look up a suite by its wire byte.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownSuite` if the byte is not registered
    pub fn from_u8(id: u8) -> Result<Self, ProtocolError> {
        Self::ALL.get(usize::from(id)).copied().ok_or(ProtocolError::UnknownSuite(id))
    }

    /// Configuration name of this suite.
    #[must_use]
    pub fn name(self) -> &'static str {
        NAMES[self as usize]
    }

    /// Payload protection applied by this suite.
    #[must_use]
    pub fn confidentiality(self) -> Confidentiality {
        if self.to_u8() < 12 { Confidentiality::None } else { Confidentiality::KuznyechikCtr }
    }

    /// KDF stage-one construction.
    #[must_use]
    pub fn inner_stage(self) -> InnerStage {
        match (self.to_u8() % 12) / 4 {
            0 => InnerStage::Nmac,
            1 => InnerStage::Hmac,
            _ => InnerStage::Simple,
        }
    }

    /// KDF stage-two construction.
    #[must_use]
    pub fn outer_stage(self) -> OuterStage {
        match self.to_u8() % 4 {
            0 => OuterStage::Nmac,
            1 => OuterStage::Hmac256,
            2 => OuterStage::Hmac512,
            _ => OuterStage::Cmac,
        }
    }

    /// Length of the integrity field (salt followed by tag) for this suite.
    ///
    /// Every registered suite currently uses a 32-byte salt and a 16-byte
    /// Kuznyechik CMAC tag, but callers must not assume a constant.
    #[must_use]
    pub fn integrity_field_length(self) -> usize {
        match self.confidentiality() {
            Confidentiality::None | Confidentiality::KuznyechikCtr => SALT_SIZE + TAG_SIZE,
        }
    }
}

impl Default for SuiteId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for SuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SuiteId {
    type Err = ProtocolError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|suite| suite.name() == name)
            .ok_or_else(|| ProtocolError::UnknownSuiteName(name.to_string()))
    }
}

impl TryFrom<u8> for SuiteId {
    type Error = ProtocolError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::from_u8(id)
    }
}
