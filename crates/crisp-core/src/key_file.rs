//! Master key storage.
//!
//! A key file is exactly 40 bytes:
//!
//! ```text
//! +-----------------------------+------------------+
//! | created_at (u64 BE, UNIX s) | master key (32)  |
//! +-----------------------------+------------------+
//! ```
//!
//! Keys older than a year should be replaced; keys older than eighteen months
//! are considered expired. Both conditions are logged, neither is fatal.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use crisp_crypto::SecretKey;
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Encoded key file length.
pub const KEY_FILE_SIZE: usize = 8 + 32;

const DAY_SECS: u64 = 24 * 60 * 60;

/// Age after which the key should be replaced.
pub const REPLACE_AFTER_SECS: u64 = 365 * DAY_SECS;

/// Age after which the key is considered expired.
pub const EXPIRE_AFTER_SECS: u64 = 548 * DAY_SECS;

/// Errors from loading a master key.
#[derive(Error, Debug)]
pub enum KeyFileError {
    /// File could not be read
    #[error("cannot read key file {path}: {source}")]
    Io {
        /// Key file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// File has the wrong size
    #[error("malformed key file: {actual} bytes, expected {KEY_FILE_SIZE}")]
    Format {
        /// Actual file size
        actual: usize,
    },
}

/// Freshness of a loaded key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAge {
    /// Within its first year.
    Fresh,
    /// Older than a year; replace soon.
    ReplaceSoon,
    /// Older than eighteen months.
    Expired,
}

impl KeyAge {
    /// Classify a key created at `created_at` as seen at `now` (UNIX seconds).
    ///
    /// Timestamps in the future count as fresh.
    pub fn classify(created_at: u64, now: u64) -> Self {
        match now.saturating_sub(created_at) {
            age if age > EXPIRE_AFTER_SECS => Self::Expired,
            age if age > REPLACE_AFTER_SECS => Self::ReplaceSoon,
            _ => Self::Fresh,
        }
    }
}

/// Anything that can hand the channel its master key.
pub trait MasterKeySource {
    /// Load the shared master key.
    ///
    /// # Errors
    ///
    /// - `KeyFileError` if the key is unavailable or malformed
    fn load(&self) -> Result<SecretKey, KeyFileError>;
}

/// A key already in memory.
impl MasterKeySource for SecretKey {
    fn load(&self) -> Result<SecretKey, KeyFileError> {
        Ok(self.clone())
    }
}

/// Key file on disk.
#[derive(Debug, Clone)]
pub struct KeyFile {
    path: PathBuf,
}

impl KeyFile {
    /// Key file at `path`. Nothing is read until [`MasterKeySource::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the key file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Split an encoded key file into creation time and key.
    ///
    /// # Errors
    ///
    /// - `KeyFileError::Format` if `bytes` is not [`KEY_FILE_SIZE`] long
    pub fn parse(bytes: &[u8]) -> Result<(u64, SecretKey), KeyFileError> {
        if bytes.len() != KEY_FILE_SIZE {
            return Err(KeyFileError::Format { actual: bytes.len() });
        }
        let (timestamp, key) = bytes.split_at(8);
        let mut created_at = [0u8; 8];
        created_at.copy_from_slice(timestamp);
        let key = SecretKey::from_slice(key)
            .map_err(|_| KeyFileError::Format { actual: bytes.len() })?;
        Ok((u64::from_be_bytes(created_at), key))
    }

    /// Encode a key file.
    pub fn encode(created_at: u64, key: &SecretKey) -> Zeroizing<Vec<u8>> {
        let mut bytes = Zeroizing::new(Vec::with_capacity(KEY_FILE_SIZE));
        bytes.extend_from_slice(&created_at.to_be_bytes());
        bytes.extend_from_slice(key.as_bytes());
        bytes
    }
}

impl MasterKeySource for KeyFile {
    fn load(&self) -> Result<SecretKey, KeyFileError> {
        let bytes = Zeroizing::new(
            fs::read(&self.path)
                .map_err(|source| KeyFileError::Io { path: self.path.clone(), source })?,
        );
        let (created_at, key) = Self::parse(&bytes)?;

        let now = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
        match KeyAge::classify(created_at, now) {
            KeyAge::Fresh => debug!(path = %self.path.display(), "master key loaded"),
            KeyAge::ReplaceSoon => {
                warn!(path = %self.path.display(), "master key is over a year old, replace it soon");
            },
            KeyAge::Expired => {
                warn!(path = %self.path.display(), "master key has expired, replace it now");
            },
        }
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_thresholds() {
        let created = 1_000_000;
        assert_eq!(KeyAge::classify(created, created), KeyAge::Fresh);
        assert_eq!(KeyAge::classify(created, created + REPLACE_AFTER_SECS), KeyAge::Fresh);
        assert_eq!(
            KeyAge::classify(created, created + REPLACE_AFTER_SECS + 1),
            KeyAge::ReplaceSoon
        );
        assert_eq!(KeyAge::classify(created, created + EXPIRE_AFTER_SECS + 1), KeyAge::Expired);
        assert_eq!(KeyAge::classify(created + 10, created), KeyAge::Fresh);
    }

    #[test]
    fn parse_splits_timestamp_and_key() {
        let key = SecretKey::from_array([0x5A; 32]);
        let encoded = KeyFile::encode(0x0102_0304, &key);
        let (created_at, parsed) = KeyFile::parse(&encoded).unwrap();
        assert_eq!(created_at, 0x0102_0304);
        assert_eq!(parsed, key);
    }

    #[test]
    fn parse_rejects_wrong_size() {
        assert!(matches!(KeyFile::parse(&[0u8; 39]), Err(KeyFileError::Format { actual: 39 })));
        assert!(matches!(KeyFile::parse(&[0u8; 41]), Err(KeyFileError::Format { actual: 41 })));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.key");
        let key = SecretKey::from_array([0x11; 32]);
        fs::write(&path, &*KeyFile::encode(0, &key)).unwrap();

        assert_eq!(KeyFile::new(&path).load().unwrap(), key);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = KeyFile::new(dir.path().join("absent.key")).load().unwrap_err();
        assert!(matches!(err, KeyFileError::Io { .. }));
    }
}
