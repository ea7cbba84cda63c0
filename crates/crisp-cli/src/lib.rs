//! Shared plumbing for the CRISP command-line tools.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use crisp_core::{ChannelError, ErrorCategory};
use crisp_crypto::CryptoError;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Process exit codes, one per error category.
pub mod exit_code {
    /// Security violation (peer address, hostile file name)
    pub const SECURITY: i32 = -2;
    /// Entropy unavailable or DRBG limits reached
    pub const EXHAUSTION: i32 = -3;
    /// Master key missing or malformed
    pub const KEY_FILE: i32 = -4;
    /// Connection could not be set up or was lost
    pub const CONNECTION: i32 = -5;
    /// Anything else
    pub const OTHER: i32 = -6;
    /// Received data or output could not be written
    pub const STORAGE: i32 = -7;
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();
}

/// Exit code for a channel error.
pub fn channel_exit_code(err: &ChannelError) -> i32 {
    if matches!(err, ChannelError::KeyFile(_)) {
        return exit_code::KEY_FILE;
    }
    match err.category() {
        ErrorCategory::Security => exit_code::SECURITY,
        ErrorCategory::Exhaustion => exit_code::EXHAUSTION,
        ErrorCategory::Connection => exit_code::CONNECTION,
        ErrorCategory::Storage => exit_code::STORAGE,
        ErrorCategory::Protocol | ErrorCategory::Configuration => exit_code::OTHER,
    }
}

/// Exit code for a DRBG error.
pub fn crypto_exit_code(err: &CryptoError) -> i32 {
    if err.is_exhaustion() { exit_code::EXHAUSTION } else { exit_code::OTHER }
}

/// Errors from [`parse_size`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SizeError {
    /// Not a non-negative number with an optional `K`, `M` or `G` suffix
    #[error("invalid size '{0}': expected a number with optional K, M or G suffix")]
    Invalid(String),

    /// Does not fit in 64 bits
    #[error("size '{0}' is too large")]
    TooLarge(String),
}

/// Parse a byte count such as `512`, `4K`, `1.5M` or `2G`.
///
/// Suffixes are binary (`K` = 1024) and case-insensitive. Fractional values
/// are rounded down to whole bytes.
pub fn parse_size(input: &str) -> Result<u64, SizeError> {
    let trimmed = input.trim();
    let (number, shift) = match trimmed.chars().last() {
        Some('k' | 'K') => (&trimmed[..trimmed.len() - 1], 10),
        Some('m' | 'M') => (&trimmed[..trimmed.len() - 1], 20),
        Some('g' | 'G') => (&trimmed[..trimmed.len() - 1], 30),
        _ => (trimmed, 0),
    };
    let multiplier = 1u64 << shift;

    if let Ok(whole) = number.parse::<u64>() {
        return whole.checked_mul(multiplier).ok_or_else(|| SizeError::TooLarge(input.to_owned()));
    }

    let value: f64 = number.parse().map_err(|_| SizeError::Invalid(input.to_owned()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(SizeError::Invalid(input.to_owned()));
    }
    let bytes = (value * multiplier as f64).floor();
    if bytes >= u64::MAX as f64 {
        return Err(SizeError::TooLarge(input.to_owned()));
    }
    Ok(bytes as u64)
}

#[cfg(test)]
mod tests {
    use std::io;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn sizes_with_suffixes() {
        assert_eq!(parse_size("0"), Ok(0));
        assert_eq!(parse_size("512"), Ok(512));
        assert_eq!(parse_size("4K"), Ok(4096));
        assert_eq!(parse_size("4k"), Ok(4096));
        assert_eq!(parse_size("3M"), Ok(3 << 20));
        assert_eq!(parse_size("2G"), Ok(2 << 30));
        assert_eq!(parse_size(" 7K "), Ok(7 << 10));
    }

    #[test]
    fn fractional_sizes_round_down() {
        assert_eq!(parse_size("1.5K"), Ok(1536));
        assert_eq!(parse_size("0.5M"), Ok(1 << 19));
        assert_eq!(parse_size("2.7"), Ok(2));
        assert_eq!(parse_size("0.001K"), Ok(1));
    }

    #[test]
    fn invalid_sizes() {
        for input in ["", "K", "abc", "-1", "1.5T", "-0.5K", "NaN", "inf"] {
            assert_eq!(parse_size(input), Err(SizeError::Invalid(input.to_owned())), "{input}");
        }
        assert!(matches!(parse_size("18446744073709551615G"), Err(SizeError::TooLarge(_))));
    }

    #[test]
    fn exit_codes_follow_categories() {
        assert_eq!(
            channel_exit_code(&ChannelError::CompromiseAttempt("x".into())),
            exit_code::SECURITY
        );
        assert_eq!(
            channel_exit_code(&ChannelError::Crypto(CryptoError::LackOfEntropy("x".into()))),
            exit_code::EXHAUSTION
        );
        assert_eq!(
            channel_exit_code(&ChannelError::KeyFile(crisp_core::KeyFileError::Format {
                actual: 3
            })),
            exit_code::KEY_FILE
        );
        assert_eq!(channel_exit_code(&ChannelError::SocketClosed), exit_code::CONNECTION);
        assert_eq!(
            channel_exit_code(&ChannelError::Storage {
                path: "x".into(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            }),
            exit_code::STORAGE
        );
        assert_eq!(channel_exit_code(&ChannelError::PeerRejected), exit_code::OTHER);
        assert_eq!(
            crypto_exit_code(&CryptoError::QueryLimit { requested: 1, max: 0 }),
            exit_code::EXHAUSTION
        );
    }

    proptest! {
        #[test]
        fn whole_kilobytes_are_exact(n in 0u64..1 << 40) {
            prop_assert_eq!(parse_size(&format!("{n}K")), Ok(n << 10));
        }
    }
}
