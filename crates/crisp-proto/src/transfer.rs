//! Transfer envelope and control tokens.
//!
//! A transfer starts with an info message announcing how many chunk frames
//! follow and what they carry:
//!
//! ```text
//! [count: u64 BE][type: "TEXT" | "FILE"][filename bytes (FILE only)]
//! ```
//!
//! The receiver answers with a control token before any chunk is sent.

use bytes::{BufMut, Bytes, BytesMut};

use crate::errors::{ProtocolError, Result};

/// Reply accepting a transfer or confirming a request.
pub const ACCEPT: &[u8] = b"ACCEPT";

/// Reply refusing a transfer or a handshake.
pub const ERROR: &[u8] = b"ERROR";

const TEXT_TAG: &[u8; 4] = b"TEXT";
const FILE_TAG: &[u8; 4] = b"FILE";

/// Control token carried as an ordinary authenticated payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlToken {
    /// `ACCEPT`
    Accept,
    /// `ERROR`
    Error,
}

impl ControlToken {
    /// Wire bytes of the token.
    #[must_use]
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Accept => ACCEPT,
            Self::Error => ERROR,
        }
    }

    /// Recognize a token. `None` for any other payload.
    #[must_use]
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload {
            ACCEPT => Some(Self::Accept),
            ERROR => Some(Self::Error),
            _ => None,
        }
    }
}

/// What the chunks of a transfer reassemble into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Message text shown to the user.
    Text,
    /// File contents written to disk.
    File,
}

/// Decoded info message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInfo {
    /// Number of chunk frames that follow.
    pub count: u64,
    /// Type of the reassembled data.
    pub kind: TransferKind,
    /// Sender-supplied file name, empty for text. Untrusted.
    pub filename: Bytes,
}

impl TransferInfo {
    /// Size of the fixed part (count and type tag).
    pub const MIN_LEN: usize = 12;

    /// Announce a text transfer.
    #[must_use]
    pub fn text(count: u64) -> Self {
        Self { count, kind: TransferKind::Text, filename: Bytes::new() }
    }

    /// Announce a file transfer.
    #[must_use]
    pub fn file(count: u64, filename: impl Into<Bytes>) -> Self {
        Self { count, kind: TransferKind::File, filename: filename.into() }
    }

    /// Serialize the envelope.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::MIN_LEN + self.filename.len());
        buf.put_u64(self.count);
        match self.kind {
            TransferKind::Text => buf.put_slice(TEXT_TAG),
            TransferKind::File => {
                buf.put_slice(FILE_TAG);
                buf.put_slice(&self.filename);
            },
        }
        buf.freeze()
    }

    /// Parse an envelope.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidTransferInfo` if the envelope is shorter than
    ///   [`TransferInfo::MIN_LEN`], carries an unknown type tag, or a text
    ///   envelope carries trailing bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::MIN_LEN {
            return Err(ProtocolError::InvalidTransferInfo(format!(
                "{} bytes, expected at least {}",
                bytes.len(),
                Self::MIN_LEN
            )));
        }

        let (count, rest) = bytes.split_at(8);
        let (tag, tail) = rest.split_at(4);
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(count);
        let count = u64::from_be_bytes(count_bytes);

        match tag {
            t if t == TEXT_TAG && tail.is_empty() => Ok(Self::text(count)),
            t if t == TEXT_TAG => {
                Err(ProtocolError::InvalidTransferInfo("text transfer carries a filename".into()))
            },
            t if t == FILE_TAG => Ok(Self::file(count, Bytes::copy_from_slice(tail))),
            other => Err(ProtocolError::InvalidTransferInfo(format!(
                "unknown transfer type {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}
