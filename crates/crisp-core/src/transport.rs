//! Stream transport for frames.
//!
//! Every frame travels behind a 2-byte big-endian length prefix:
//!
//! ```text
//! +----------------+------------------------+
//! | length (u16 BE)| encoded frame (length) |
//! +----------------+------------------------+
//! ```
//!
//! This layer only moves bytes. Suite checks and integrity live in the
//! channel.

use std::{
    io::{self, Read, Write},
    net::{IpAddr, Shutdown, SocketAddr, TcpListener, TcpStream},
    thread,
    time::Duration,
};

use bytes::{BufMut, BytesMut};
use crisp_proto::{Frame, MAX_FRAME_SIZE, ProtocolError};
use tracing::{debug, warn};

use crate::ChannelError;

/// Size of the length prefix in front of every frame.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// One direction-agnostic stream carrying length-prefixed frames.
#[derive(Debug)]
pub struct FramedStream<S> {
    stream: S,
}

impl<S: Read + Write> FramedStream<S> {
    /// Wrap a byte stream.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Unwrap the byte stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Write one frame.
    ///
    /// # Errors
    ///
    /// - `ChannelError::SocketClosed` if the stream was shut down
    /// - `ChannelError::Send` on other I/O failures
    pub fn write_frame(&mut self, frame: &Frame) -> Result<(), ChannelError> {
        let len = frame.encoded_len();
        let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + len);
        // Frame::new caps frames at MAX_FRAME_SIZE, well inside u16.
        buf.put_u16(len as u16);
        frame.encode(&mut buf);

        self.stream.write_all(&buf).map_err(ChannelError::from_write)?;
        self.stream.flush().map_err(ChannelError::from_write)
    }

    /// Block until one complete frame has arrived and decode it.
    ///
    /// # Errors
    ///
    /// - `ChannelError::SocketClosed` if the stream ended
    /// - `ChannelError::Recv` on other I/O failures
    /// - `ChannelError::Protocol` if the prefix or frame is malformed
    pub fn read_frame(&mut self) -> Result<Frame, ChannelError> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        self.stream.read_exact(&mut prefix).map_err(ChannelError::from_read)?;
        let len = usize::from(u16::from_be_bytes(prefix));
        if len > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: len, max: MAX_FRAME_SIZE }.into());
        }

        let mut buf = vec![0u8; len];
        self.stream.read_exact(&mut buf).map_err(ChannelError::from_read)?;
        Ok(Frame::decode(&buf)?)
    }
}

/// Accept one connection and check that it comes from `expected`.
///
/// Only the IP address is compared; the peer dials from an ephemeral port.
///
/// # Errors
///
/// - `ChannelError::InitConnection` if `accept` fails
/// - `ChannelError::CompromiseAttempt` if another host connected
pub fn accept_from(listener: &TcpListener, expected: IpAddr) -> Result<TcpStream, ChannelError> {
    let local = listener.local_addr().map_err(|source| ChannelError::InitConnection {
        addr: SocketAddr::new(expected, 0),
        source,
    })?;
    let (stream, remote) =
        listener.accept().map_err(|source| ChannelError::InitConnection { addr: local, source })?;

    if remote.ip() != expected {
        warn!(%remote, %expected, "rejected connection from unexpected address");
        let _ = stream.shutdown(Shutdown::Both);
        return Err(ChannelError::CompromiseAttempt(format!(
            "connection from {remote}, expected {expected}"
        )));
    }

    debug!(%remote, "accepted inbound connection");
    Ok(stream)
}

/// Dial `addr`, retrying every `retry` while the peer is not listening yet.
///
/// Retries indefinitely on `ConnectionRefused`; any other failure is
/// returned.
///
/// # Errors
///
/// - `ChannelError::InitConnection` on any error other than refusal
pub fn connect_with_retry(addr: SocketAddr, retry: Duration) -> Result<TcpStream, ChannelError> {
    loop {
        match TcpStream::connect(addr) {
            Ok(stream) => {
                debug!(%addr, "outbound connection established");
                return Ok(stream);
            },
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                debug!(%addr, "peer not listening yet, retrying");
                thread::sleep(retry);
            },
            Err(source) => return Err(ChannelError::InitConnection { addr, source }),
        }
    }
}
