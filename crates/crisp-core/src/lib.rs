//! CRISP Channel Core
//!
//! The protocol engine of the CRISP messenger: a two-party channel over a
//! pair of TCP streams that authenticates (and for most suites encrypts)
//! every message with keys derived freshly from a shared master key.
//!
//! # Architecture
//!
//! ```text
//! Channel ── send/recv, trial, reassembly
//!    │
//!    ├── MessagePipeline (chosen once from the suite)
//!    │      └── Kdf<I, O> → CMAC tag, Kuznyechik-CTR
//!    │
//!    └── FramedStream (2-byte length prefix + Frame codec)
//!           └── TcpStream
//! ```
//!
//! # Security
//!
//! Integrity:
//! - Every frame carries `salt || tag`; tags are checked in constant time
//!   before any decryption
//! - Frames from a different suite are rejected outright
//!
//! Replay:
//! - Replies must carry `request + 1`
//! - Chunks must fall inside the window announced by their info message and
//!   may not repeat
//!
//! Lockdown:
//! - Peer address mismatch, hostile file names and entropy exhaustion shut
//!   the channel down and every later call fails

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod channel;
mod config;
mod error;
pub mod key_file;
pub mod pipeline;
pub mod reassembly;
pub mod transport;

pub use channel::{
    Channel, ChannelState, MAX_FILE_SIZE, Outgoing, Received, TRIAL_NONCE_SIZE, next_sequence,
    sanitize_filename,
};
pub use config::{
    ChannelConfig, DEFAULT_CONNECT_RETRY, DEFAULT_DIRECTORY, UserTag, user_tag,
};
pub use error::{ChannelError, ErrorCategory};
pub use key_file::{KeyAge, KeyFile, KeyFileError, MasterKeySource};
pub use pipeline::{MessagePipeline, pipeline_for};
pub use reassembly::ReassemblyBuffer;
pub use transport::FramedStream;
