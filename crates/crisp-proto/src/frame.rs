//! Single-frame wire codec.
//!
//! Layout on the wire (all integers big endian):
//!
//! ```text
//! byte 0      : [external key id flag:1][version high:7]
//! byte 1      : version low
//! byte 2      : suite id
//! byte 3      : key id info ([0][key id:7] or [1][length:7])
//! bytes 4..   : key id bytes (long form only)
//! next 6      : sequence number (48 bits)
//! next n      : payload
//! last k      : integrity field (k fixed by the suite)
//! ```
//!
//! The whole frame never exceeds [`MAX_FRAME_SIZE`]. On the transport every
//! frame is preceded by a two-byte big-endian length, which this module does
//! not handle.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    SuiteId,
    errors::{ProtocolError, Result},
};

/// Maximum encoded size of a frame, including header and integrity field.
pub const MAX_FRAME_SIZE: usize = 2048;

/// Largest representable protocol version (15 bits).
pub const MAX_VERSION: u16 = 0x7FFF;

/// Mask selecting the 48 bits carried by the sequence number field.
pub const SEQUENCE_MASK: u64 = (1 << 48) - 1;

/// Bytes of the sequence number field.
const SEQUENCE_SIZE: usize = 6;

/// Flag/version (2), suite (1), key id info byte (1).
const PREFIX_SIZE: usize = 4;

/// Top bit of byte 0 and of the key id info byte.
const HIGH_BIT: u8 = 0x80;

/// Longest key id the long form can describe.
const MAX_KEY_ID_LEN: usize = 0x7F;

/// Key identifier carried in the header.
///
/// A one-byte identifier below `0x80` lives inside the info byte itself; any
/// other length (including zero) uses the long form, where the info byte
/// holds the length and the identifier follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyId {
    /// Identifier stored in the low 7 bits of the info byte.
    Small(u8),
    /// Identifier of 0 or 2..=127 bytes following the info byte.
    Large(Bytes),
}

impl KeyId {
    /// Build the canonical representation of a key identifier.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidKeyId` if a single byte has its top bit set
    ///   or the identifier is longer than 127 bytes
    pub fn new(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [byte] if byte & HIGH_BIT == 0 => Ok(Self::Small(*byte)),
            [_] => Err(ProtocolError::InvalidKeyId("single-byte key id must be below 0x80")),
            _ if bytes.len() > MAX_KEY_ID_LEN => {
                Err(ProtocolError::InvalidKeyId("key id longer than 127 bytes"))
            },
            _ => Ok(Self::Large(Bytes::copy_from_slice(bytes))),
        }
    }

    /// Raw identifier bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Small(byte) => std::slice::from_ref(byte),
            Self::Large(bytes) => bytes,
        }
    }

    /// Bytes this identifier occupies in the header, info byte included.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Small(_) => 1,
            Self::Large(bytes) => 1 + bytes.len(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Small(byte) if byte & HIGH_BIT != 0 => {
                Err(ProtocolError::InvalidKeyId("single-byte key id must be below 0x80"))
            },
            Self::Large(bytes) if bytes.len() == 1 => {
                Err(ProtocolError::InvalidKeyId("single-byte key id must use the short form"))
            },
            Self::Large(bytes) if bytes.len() > MAX_KEY_ID_LEN => {
                Err(ProtocolError::InvalidKeyId("key id longer than 127 bytes"))
            },
            _ => Ok(()),
        }
    }

    fn encode(&self, dst: &mut impl BufMut) {
        match self {
            Self::Small(byte) => dst.put_u8(*byte),
            Self::Large(bytes) => {
                dst.put_u8(HIGH_BIT | bytes.len() as u8);
                dst.put_slice(bytes);
            },
        }
    }
}

impl Default for KeyId {
    fn default() -> Self {
        Self::Small(0)
    }
}

/// One self-contained protocol message.
///
/// # Invariants
///
/// - `version <= MAX_VERSION` and `sequence <= SEQUENCE_MASK`
/// - `integrity.len() == suite.integrity_field_length()`
/// - `encoded_len() <= MAX_FRAME_SIZE`
///
/// All constructors enforce these, which is why [`Frame::encode`] cannot
/// fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    external_key_id: bool,
    version: u16,
    suite: SuiteId,
    key_id: KeyId,
    sequence: u64,
    payload: Bytes,
    integrity: Bytes,
}

impl Frame {
    /// Create a version-0 frame with the default key id.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidSequence` if `sequence` exceeds 48 bits
    /// - `ProtocolError::IntegrityFieldLength` if the integrity field does not
    ///   match the suite
    /// - `ProtocolError::FrameTooLarge` if the encoded frame would exceed
    ///   [`MAX_FRAME_SIZE`]
    pub fn new(
        suite: SuiteId,
        sequence: u64,
        payload: impl Into<Bytes>,
        integrity: impl Into<Bytes>,
    ) -> Result<Self> {
        if sequence > SEQUENCE_MASK {
            return Err(ProtocolError::InvalidSequence(sequence));
        }

        let integrity = integrity.into();
        if integrity.len() != suite.integrity_field_length() {
            return Err(ProtocolError::IntegrityFieldLength {
                expected: suite.integrity_field_length(),
                actual: integrity.len(),
            });
        }

        let frame = Self {
            external_key_id: false,
            version: 0,
            suite,
            key_id: KeyId::default(),
            sequence,
            payload: payload.into(),
            integrity,
        };
        frame.check_size()?;
        Ok(frame)
    }

    /// Replace the protocol version.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidVersion` if `version` exceeds 15 bits
    pub fn with_version(mut self, version: u16) -> Result<Self> {
        if version > MAX_VERSION {
            return Err(ProtocolError::InvalidVersion(version));
        }
        self.version = version;
        Ok(self)
    }

    /// Set the external key id flag.
    #[must_use]
    pub fn with_external_key_id(mut self, external: bool) -> Self {
        self.external_key_id = external;
        self
    }

    /// Replace the key identifier.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidKeyId` if the identifier is not in canonical
    ///   form
    /// - `ProtocolError::FrameTooLarge` if the longer header pushes the frame
    ///   past [`MAX_FRAME_SIZE`]
    pub fn with_key_id(mut self, key_id: KeyId) -> Result<Self> {
        key_id.validate()?;
        self.key_id = key_id;
        self.check_size()?;
        Ok(self)
    }

    /// Largest payload a frame of this suite can carry with the given key id.
    #[must_use]
    pub fn max_payload_len(suite: SuiteId, key_id: &KeyId) -> usize {
        MAX_FRAME_SIZE - Self::header_len(key_id) - suite.integrity_field_length()
    }

    fn header_len(key_id: &KeyId) -> usize {
        PREFIX_SIZE - 1 + key_id.encoded_len() + SEQUENCE_SIZE
    }

    fn check_size(&self) -> Result<()> {
        let size = self.encoded_len();
        if size > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size, max: MAX_FRAME_SIZE });
        }
        Ok(())
    }

    /// Whether the key id refers to an externally managed key.
    #[must_use]
    pub fn external_key_id(&self) -> bool {
        self.external_key_id
    }

    /// Protocol version (15 bits).
    #[must_use]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Suite the frame was protected with.
    #[must_use]
    pub fn suite(&self) -> SuiteId {
        self.suite
    }

    /// Key identifier.
    #[must_use]
    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    /// 48-bit sequence number.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Payload bytes (ciphertext for encrypting suites).
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Integrity field: salt followed by tag.
    #[must_use]
    pub fn integrity(&self) -> &Bytes {
        &self.integrity
    }

    /// Total number of bytes [`Frame::encode`] writes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        Self::header_len(&self.key_id) + self.payload.len() + self.integrity.len()
    }

    /// Serialize the frame.
    pub fn encode(&self, dst: &mut impl BufMut) {
        debug_assert!(self.encoded_len() <= MAX_FRAME_SIZE);

        let [high, low] = self.version.to_be_bytes();
        let flag = if self.external_key_id { HIGH_BIT } else { 0 };
        dst.put_u8(flag | (high & !HIGH_BIT));
        dst.put_u8(low);
        dst.put_u8(self.suite.to_u8());
        self.key_id.encode(dst);
        dst.put_slice(&self.sequence.to_be_bytes()[8 - SEQUENCE_SIZE..]);
        dst.put_slice(&self.payload);
        dst.put_slice(&self.integrity);
    }

    /// Serialize into a freshly allocated buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Parse a complete frame.
    ///
    /// The buffer must hold exactly one frame: everything between the header
    /// and the suite's integrity field is payload.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if the buffer cannot hold the header
    ///   and integrity field of the declared suite
    /// - `ProtocolError::FrameTooLarge` if the buffer exceeds
    ///   [`MAX_FRAME_SIZE`]
    /// - `ProtocolError::UnknownSuite` if the suite byte is not registered
    /// - `ProtocolError::InvalidKeyId` for a non-canonical key id encoding
    ///
    /// # Security
    ///
    /// Parsing is structural only. The integrity field is not checked here;
    /// the payload must not be trusted until the channel has verified the tag.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: bytes.len(), max: MAX_FRAME_SIZE });
        }

        let &[first, second, suite, info, ..] = bytes else {
            return Err(ProtocolError::FrameTooShort {
                expected: PREFIX_SIZE + SEQUENCE_SIZE,
                actual: bytes.len(),
            });
        };

        let external_key_id = first & HIGH_BIT != 0;
        let version = u16::from_be_bytes([first & !HIGH_BIT, second]);
        let suite = SuiteId::from_u8(suite)?;

        let key_id_extra = if info & HIGH_BIT == 0 { 0 } else { usize::from(info & !HIGH_BIT) };
        let header_len = PREFIX_SIZE + key_id_extra + SEQUENCE_SIZE;
        let integrity_len = suite.integrity_field_length();
        let minimum = header_len + integrity_len;
        if bytes.len() < minimum {
            return Err(ProtocolError::FrameTooShort { expected: minimum, actual: bytes.len() });
        }

        let key_id = if info & HIGH_BIT == 0 {
            KeyId::Small(info)
        } else if key_id_extra == 1 {
            return Err(ProtocolError::InvalidKeyId("single-byte key id in long form"));
        } else {
            KeyId::Large(Bytes::copy_from_slice(&bytes[PREFIX_SIZE..PREFIX_SIZE + key_id_extra]))
        };

        let sequence = bytes[header_len - SEQUENCE_SIZE..header_len]
            .iter()
            .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte));

        let payload_end = bytes.len() - integrity_len;

        Ok(Self {
            external_key_id,
            version,
            suite,
            key_id,
            sequence,
            payload: Bytes::copy_from_slice(&bytes[header_len..payload_end]),
            integrity: Bytes::copy_from_slice(&bytes[payload_end..]),
        })
    }
}
