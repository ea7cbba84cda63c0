//! CRISP messenger wire protocol.
//!
//! Binary formats shared by both peers of a channel:
//!
//! - [`Frame`]: one message (header, payload, integrity field)
//! - [`SuiteId`]: the closed catalogue of cryptographic suites
//! - [`TransferInfo`] and [`ControlToken`]: the envelope announcing a
//!   multi-chunk transfer and the replies to it
//!
//! This crate does no cryptography. Frames are parsed structurally; the
//! integrity field is opaque here and verified by the channel.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod errors;
mod frame;
mod suite;
mod transfer;

pub use errors::{ProtocolError, Result};
pub use frame::{Frame, KeyId, MAX_FRAME_SIZE, MAX_VERSION, SEQUENCE_MASK};
pub use suite::{Confidentiality, InnerStage, OuterStage, SALT_SIZE, SuiteId, TAG_SIZE};
pub use transfer::{ACCEPT, ControlToken, ERROR, TransferInfo, TransferKind};
