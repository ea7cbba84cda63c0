//! Error types for the channel layer.
//!
//! Lower layers raise their own typed errors ([`ProtocolError`],
//! [`CryptoError`], [`KeyFileError`]); the channel wraps them and adds the
//! failures only it can detect. [`ChannelError::category`] maps every error
//! onto the handling policy the application applies.

use std::{io, net::SocketAddr, path::PathBuf};

use crisp_crypto::CryptoError;
use crisp_proto::{ProtocolError, SuiteId};
use thiserror::Error;

use crate::{channel::ChannelState, key_file::KeyFileError};

/// How the application should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad message from the peer. The channel stays usable.
    Protocol,
    /// Transport failure. The channel is unusable.
    Connection,
    /// Attack indicator. The channel is locked down.
    Security,
    /// No trustworthy randomness left. The channel is locked down.
    Exhaustion,
    /// Bad local setup (suite name, key file, argument).
    Configuration,
    /// Received data could not be stored.
    Storage,
}

/// Errors from channel construction and message exchange.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Malformed frame or envelope
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Key derivation or random generation failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Master key could not be loaded
    #[error(transparent)]
    KeyFile(#[from] KeyFileError),

    /// Recomputed tag does not match the one on the wire
    #[error("integrity check failed for message {sequence:#014x}")]
    IntegrityFailure {
        /// Sequence number of the rejected frame
        sequence: u64,
    },

    /// Peer protects its frames with a different suite
    #[error("suite mismatch: expected {expected}, peer used {actual}")]
    SuiteMismatch {
        /// Suite this channel was configured with
        expected: SuiteId,
        /// Suite found in the frame header
        actual: SuiteId,
    },

    /// Peer answered a transfer or trial with `ERROR`
    #[error("peer rejected the message")]
    PeerRejected,

    /// Reply carried the wrong sequence number or content
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// Chunk sequence number falls outside the announced transfer
    #[error("message {sequence:#014x} is outside the transfer window {first:#014x}..={last:#014x}")]
    OutOfWindow {
        /// Sequence number received
        sequence: u64,
        /// First acceptable chunk sequence number
        first: u64,
        /// Last acceptable chunk sequence number
        last: u64,
    },

    /// Same chunk sequence number seen twice in one transfer
    #[error("duplicate message {0:#014x}")]
    DuplicateSequence(u64),

    /// Transfer does not start where the previous one ended
    #[error("message {sequence:#014x} replayed or injected, expected {expected:#014x}")]
    ReplayedMessage {
        /// Sequence number received
        sequence: u64,
        /// Sequence number the next transfer must carry
        expected: u64,
    },

    /// Listening, accepting or connecting failed
    #[error("failed to initialise connection with {addr}: {source}")]
    InitConnection {
        /// Address being bound or dialled
        addr: SocketAddr,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The transport was shut down, locally or by the peer
    #[error("socket closed")]
    SocketClosed,

    /// Reading from the transport failed
    #[error("receive failed: {0}")]
    Recv(#[source] io::Error),

    /// Writing to the transport failed
    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    /// Unexpected peer address or hostile file name
    #[error("compromise attempt: {0}")]
    CompromiseAttempt(String),

    /// Received file could not be written
    #[error("cannot store {path}: {source}")]
    Storage {
        /// Destination that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Operation not allowed in the current state
    #[error("cannot {operation} in state {state:?}")]
    InvalidState {
        /// Current state
        state: ChannelState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Caller-supplied value is out of range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ChannelError {
    /// Classify the error for the application's handling policy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Protocol(ProtocolError::UnknownSuiteName(_)) | Self::KeyFile(_) => {
                ErrorCategory::Configuration
            },
            Self::Crypto(err) if err.is_exhaustion() => ErrorCategory::Exhaustion,
            Self::Crypto(_) | Self::InvalidArgument(_) => ErrorCategory::Configuration,
            Self::Protocol(_)
            | Self::IntegrityFailure { .. }
            | Self::SuiteMismatch { .. }
            | Self::PeerRejected
            | Self::UnexpectedReply(_)
            | Self::OutOfWindow { .. }
            | Self::DuplicateSequence(_) => ErrorCategory::Protocol,
            Self::InitConnection { .. }
            | Self::SocketClosed
            | Self::Recv(_)
            | Self::Send(_)
            | Self::InvalidState { .. } => ErrorCategory::Connection,
            Self::CompromiseAttempt(_) | Self::ReplayedMessage { .. } => ErrorCategory::Security,
            Self::Storage { .. } => ErrorCategory::Storage,
        }
    }

    /// Returns true if the channel cannot be used after this error.
    ///
    /// Protocol, configuration and storage errors concern a single message or
    /// call. Everything else ends the channel.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Connection | ErrorCategory::Security | ErrorCategory::Exhaustion
        )
    }

    /// Returns true if the channel must be shut down and refuse further use.
    pub fn requires_lockdown(&self) -> bool {
        matches!(self.category(), ErrorCategory::Security | ErrorCategory::Exhaustion)
    }

    /// Returns true if this is the clean-shutdown signal raised after
    /// [`Channel::close`](crate::Channel::close).
    pub fn is_socket_closed(&self) -> bool {
        matches!(self, Self::SocketClosed)
    }

    pub(crate) fn from_read(err: io::Error) -> Self {
        if is_closed_kind(err.kind()) { Self::SocketClosed } else { Self::Recv(err) }
    }

    pub(crate) fn from_write(err: io::Error) -> Self {
        if is_closed_kind(err.kind()) { Self::SocketClosed } else { Self::Send(err) }
    }
}

fn is_closed_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
    )
}
