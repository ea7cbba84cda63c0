//! Channel configuration.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use crisp_proto::SuiteId;

use crate::ChannelError;

/// 16-byte user identifier bound into every derived key.
pub type UserTag = [u8; 16];

/// Time between connection attempts while the peer is not yet listening.
pub const DEFAULT_CONNECT_RETRY: Duration = Duration::from_millis(500);

/// Directory received files are written to unless configured otherwise.
pub const DEFAULT_DIRECTORY: &str = "received_files";

/// Convert a user name into a zero-padded [`UserTag`].
///
/// # Errors
///
/// - `ChannelError::InvalidArgument` if `name` is longer than 16 bytes
pub fn user_tag(name: &str) -> Result<UserTag, ChannelError> {
    let bytes = name.as_bytes();
    if bytes.len() > 16 {
        return Err(ChannelError::InvalidArgument(format!(
            "user name '{name}' is {} bytes, at most 16 allowed",
            bytes.len()
        )));
    }
    let mut tag = [0u8; 16];
    tag[..bytes.len()].copy_from_slice(bytes);
    Ok(tag)
}

/// Settings for one [`Channel`](crate::Channel).
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Port to accept the peer's connection on
    pub local_port: u16,
    /// Peer's listening address
    pub peer: SocketAddr,
    /// Suite both peers must use
    pub suite: SuiteId,
    /// Our user tag, used for outgoing messages
    pub local_user: UserTag,
    /// Peer's user tag, used for incoming messages
    pub remote_user: UserTag,
    /// Where received files are stored
    pub directory: PathBuf,
    /// Delay between refused connection attempts
    pub connect_retry: Duration,
}

impl ChannelConfig {
    /// Configuration with defaults for the remaining fields.
    ///
    /// The local port defaults to the peer's port, the usual setup when both
    /// hosts run the messenger on the same port.
    pub fn new(peer: SocketAddr, suite: SuiteId, local_user: UserTag, remote_user: UserTag) -> Self {
        Self {
            local_port: peer.port(),
            peer,
            suite,
            local_user,
            remote_user,
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            connect_retry: DEFAULT_CONNECT_RETRY,
        }
    }
}
