//! Point-to-point secure channel.
//!
//! Each peer is server and client at once: it accepts the peer's connection
//! on its own port (inbound) and dials the peer's port (outbound). Messages
//! originate on the outbound stream; replies travel back on the stream the
//! request arrived on, numbered `request + 1`.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ bind ┌──────────────┐ accept+connect, ┌───────────┐ nonce ┌───────────┐
//! │ Init │─────>│ SocketsBound │────────────────>│ KeyLoaded │──────>│ TrialSent │
//! └──────┘      └──────────────┘    load key     └───────────┘       └───────────┘
//!                                                                           │ echo matches
//!                                                                           ↓
//!     ┌────────┐   close()    ┌───────┐                           ┌────────────────┐
//!     │ Closed │<─────────────│ Ready │<──────────────────────────│ TrialConfirmed │
//!     └────────┘              └───────┘                           └────────────────┘
//!                                 │ security violation / entropy exhausted
//!                                 ↓
//!                            ┌────────┐
//!                            │ Failed │
//!                            └────────┘
//! ```
//!
//! # Transfers
//!
//! ```text
//! sender                                   receiver
//!   │ info  (count, TEXT|FILE, name)  s      │
//!   │─────────────────────────────────────────>│
//!   │ ACCEPT | ERROR                  s+1    │
//!   │<─────────────────────────────────────────│
//!   │ chunk 0                         s+2    │
//!   │─────────────────────────────────────────>│
//!   │ ...                                    │
//!   │ chunk count-1                   s+count+1
//!   │─────────────────────────────────────────>│
//! ```
//!
//! # Security
//!
//! - Every frame is verified before any decryption
//! - The trial exchange proves both peers hold the same master key and suite
//!   before user traffic flows
//! - Chunks outside the announced window or repeated within it are rejected,
//!   and the channel fails since the stream is no longer in step
//! - Each transfer must start right after the previous one, so old transfers
//!   cannot be replayed
//! - Security violations and entropy exhaustion shut the channel down for good

use std::{
    borrow::Cow,
    fs::{self, OpenOptions},
    io::{self, Write},
    net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
    thread,
};

use crisp_crypto::{CtrDrbg, Salt, SecretKey, tags_equal};
use crisp_proto::{
    ACCEPT, ControlToken, ERROR, Frame, KeyId, ProtocolError, SALT_SIZE, SEQUENCE_MASK, SuiteId,
    TAG_SIZE, TransferInfo, TransferKind,
};
use tracing::{debug, info, warn};

use crate::{
    ChannelConfig, ChannelError, MasterKeySource,
    pipeline::{MessagePipeline, pipeline_for},
    reassembly::ReassemblyBuffer,
    transport::{FramedStream, accept_from, connect_with_retry},
};

/// Size of the random nonce exchanged during the trial.
pub const TRIAL_NONCE_SIZE: usize = 16;

/// Largest file [`Channel::send`] accepts.
pub const MAX_FILE_SIZE: u64 = 2 << 30;

/// Random bytes prefixed (hex encoded) to received file names.
const FILE_PREFIX_BYTES: usize = 8;

/// Channel lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Nothing set up yet
    Init,
    /// Listening endpoint bound
    SocketsBound,
    /// Both streams open and master key loaded
    KeyLoaded,
    /// Trial nonce sent, waiting for the echo
    TrialSent,
    /// Echo matched the nonce
    TrialConfirmed,
    /// Ready for transfers
    Ready,
    /// Closed by [`Channel::close`]
    Closed,
    /// Locked down after a security violation or entropy exhaustion
    Failed,
}

/// Data handed to [`Channel::send`].
#[derive(Debug, Clone, Copy)]
pub enum Outgoing<'a> {
    /// Message text
    Text(&'a [u8]),
    /// File to transfer; only its base name is sent
    File(&'a Path),
}

/// Data returned by [`Channel::recv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// Message text
    Text(Vec<u8>),
    /// Path of the stored file
    File(PathBuf),
}

/// Next sequence number, wrapping at 48 bits.
pub fn next_sequence(sequence: u64) -> u64 {
    sequence.wrapping_add(1) & SEQUENCE_MASK
}

/// Reduce an untrusted file name to a safe base name.
///
/// Both `/` and `\` count as separators.
///
/// # Errors
///
/// - `ChannelError::CompromiseAttempt` if nothing usable remains (empty, `.`,
///   `..`, or a name with NUL bytes)
pub fn sanitize_filename(raw: &[u8]) -> Result<String, ChannelError> {
    let name = String::from_utf8_lossy(raw);
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    if base.is_empty() || base == "." || base == ".." || base.contains('\0') {
        return Err(ChannelError::CompromiseAttempt(format!("unusable file name {name:?}")));
    }
    Ok(base.to_owned())
}

struct Outbound {
    stream: FramedStream<TcpStream>,
    /// Last sequence number used on this stream.
    sequence: u64,
}

impl Outbound {
    fn advance(&mut self) -> u64 {
        self.sequence = next_sequence(self.sequence);
        self.sequence
    }
}

struct Inbound {
    stream: FramedStream<TcpStream>,
    /// Sequence number the peer's next transfer must start at.
    expected: u64,
}

/// Handles used to unblock both directions from any thread.
struct Sockets {
    inbound: TcpStream,
    outbound: TcpStream,
}

impl Sockets {
    fn shutdown(&self) {
        let _ = self.inbound.shutdown(Shutdown::Both);
        let _ = self.outbound.shutdown(Shutdown::Both);
    }
}

/// Authenticated, optionally encrypted channel to one peer.
///
/// `send` and `recv` may run concurrently on different threads. Concurrent
/// calls in the same direction serialize on an internal lock.
pub struct Channel {
    suite: SuiteId,
    directory: PathBuf,
    max_payload: usize,
    pipeline: Box<dyn MessagePipeline>,
    drbg: Mutex<CtrDrbg>,
    outbound: Mutex<Outbound>,
    inbound: Mutex<Inbound>,
    sockets: Sockets,
    state: Mutex<ChannelState>,
}

impl Channel {
    /// Listen on `config.local_port`, connect to the peer and run the trial.
    ///
    /// # Errors
    ///
    /// - `ChannelError::InitConnection` if binding, accepting or dialling
    ///   fails
    /// - `ChannelError::CompromiseAttempt` if another host connects first
    /// - `ChannelError::KeyFile` if the master key cannot be loaded
    /// - Any error from the trial exchange, including
    ///   `ChannelError::SuiteMismatch` and `ChannelError::IntegrityFailure`
    ///   when the peers disagree on suite or key
    pub fn establish<K>(config: &ChannelConfig, keys: &K) -> Result<Self, ChannelError>
    where
        K: MasterKeySource + ?Sized,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.local_port));
        let listener =
            TcpListener::bind(addr).map_err(|source| ChannelError::InitConnection { addr, source })?;
        Self::establish_with_listener(listener, config, keys)
    }

    /// Like [`establish`](Self::establish) with an already bound listener.
    ///
    /// # Errors
    ///
    /// Same as [`establish`](Self::establish).
    pub fn establish_with_listener<K>(
        listener: TcpListener,
        config: &ChannelConfig,
        keys: &K,
    ) -> Result<Self, ChannelError>
    where
        K: MasterKeySource + ?Sized,
    {
        debug!(from = ?ChannelState::Init, to = ?ChannelState::SocketsBound, "channel state");
        let (inbound, outbound) = connect_both(listener, config)?;
        let sockets = Sockets {
            inbound: clone_stream(&inbound, config.peer)?,
            outbound: clone_stream(&outbound, config.peer)?,
        };

        // Without a key no reply can be authenticated, so both streams are
        // simply shut down.
        let (master, drbg, sequence) = prepare(keys).inspect_err(|err| {
            warn!(%err, "channel setup failed");
            sockets.shutdown();
        })?;

        let channel = Self {
            suite: config.suite,
            directory: config.directory.clone(),
            max_payload: Frame::max_payload_len(config.suite, &KeyId::default()),
            pipeline: pipeline_for(config.suite, master, config.local_user, config.remote_user),
            drbg: Mutex::new(drbg),
            outbound: Mutex::new(Outbound { stream: FramedStream::new(outbound), sequence }),
            inbound: Mutex::new(Inbound { stream: FramedStream::new(inbound), expected: 0 }),
            sockets,
            state: Mutex::new(ChannelState::SocketsBound),
        };
        channel.transition(ChannelState::KeyLoaded);

        if let Err(err) = channel.trial() {
            warn!(%err, "trial exchange failed");
            channel.shut_down(ChannelState::Failed);
            return Err(err);
        }

        info!(peer = %config.peer, suite = %config.suite, "secure channel ready");
        Ok(channel)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        *lock(&self.state)
    }

    /// Suite protecting this channel.
    pub fn suite(&self) -> SuiteId {
        self.suite
    }

    /// Largest chunk payload carried per frame.
    pub fn max_payload_len(&self) -> usize {
        self.max_payload
    }

    /// Send text or a file as one transfer.
    ///
    /// Blocks until the peer accepted the transfer and every chunk was
    /// written.
    ///
    /// # Errors
    ///
    /// - `ChannelError::InvalidState` if the channel is not ready
    /// - `ChannelError::InvalidArgument` if the file is larger than
    ///   [`MAX_FILE_SIZE`] or has no usable name
    /// - `ChannelError::Storage` if the file cannot be read
    /// - `ChannelError::PeerRejected` if the peer answered `ERROR`
    /// - Transport, integrity and randomness errors
    pub fn send(&self, message: Outgoing<'_>) -> Result<(), ChannelError> {
        self.ensure_ready("send")?;
        let result = self.send_transfer(message);
        self.settle(result)
    }

    /// Block until the peer's next transfer has been received in full.
    ///
    /// # Errors
    ///
    /// - `ChannelError::InvalidState` if the channel is not ready
    /// - `ChannelError::SocketClosed` after [`close`](Self::close) or when
    ///   the peer hung up
    /// - `ChannelError::CompromiseAttempt` for hostile file names
    /// - `ChannelError::OutOfWindow`, `ChannelError::DuplicateSequence` for
    ///   chunks that do not belong to the transfer; the channel moves to
    ///   [`ChannelState::Failed`]
    /// - `ChannelError::ReplayedMessage` if the transfer does not start where
    ///   the previous one ended
    /// - `ChannelError::Storage` if the file cannot be written
    /// - Transport, integrity and randomness errors
    pub fn recv(&self) -> Result<Received, ChannelError> {
        self.ensure_ready("recv")?;
        let result = self.recv_transfer();
        self.settle(result)
    }

    /// Shut down both directions. Blocked `send`/`recv` calls return
    /// `ChannelError::SocketClosed`. Idempotent.
    pub fn close(&self) {
        self.shut_down(ChannelState::Closed);
    }

    fn trial(&self) -> Result<(), ChannelError> {
        let mut nonce = [0u8; TRIAL_NONCE_SIZE];
        lock(&self.drbg).generate(&mut nonce, None)?;

        let mut outbound = lock(&self.outbound);
        let sent = outbound.advance();
        self.send_message(&mut outbound.stream, sent, &nonce)?;
        self.transition(ChannelState::TrialSent);

        self.answer_trial()?;

        let echo = self.await_reply(&mut outbound.stream, sent)?;
        outbound.sequence = next_sequence(sent);
        if ControlToken::parse(&echo) == Some(ControlToken::Error) {
            return Err(ChannelError::PeerRejected);
        }
        if !tags_equal(&echo, &nonce) {
            return Err(ChannelError::UnexpectedReply("trial echo differs from nonce".into()));
        }

        self.transition(ChannelState::TrialConfirmed);
        self.transition(ChannelState::Ready);
        Ok(())
    }

    fn answer_trial(&self) -> Result<(), ChannelError> {
        let mut inbound = lock(&self.inbound);
        let (sequence, nonce) = self.recv_message(&mut inbound.stream)?;
        let reply = next_sequence(sequence);
        inbound.expected = next_sequence(reply);

        if nonce.len() != TRIAL_NONCE_SIZE {
            self.send_message(&mut inbound.stream, reply, ERROR)?;
            return Err(ChannelError::UnexpectedReply(format!(
                "trial nonce of {} bytes, expected {TRIAL_NONCE_SIZE}",
                nonce.len()
            )));
        }
        self.send_message(&mut inbound.stream, reply, &nonce)
    }

    fn send_transfer(&self, message: Outgoing<'_>) -> Result<(), ChannelError> {
        let (kind, name, data) = match message {
            Outgoing::Text(text) => (TransferKind::Text, Vec::new(), Cow::Borrowed(text)),
            Outgoing::File(path) => {
                let (name, data) = self.read_file(path)?;
                (TransferKind::File, name, Cow::Owned(data))
            },
        };

        let count = data.len().div_ceil(self.max_payload) as u64;
        let info = match kind {
            TransferKind::Text => TransferInfo::text(count),
            TransferKind::File => TransferInfo::file(count, name),
        };

        let mut outbound = lock(&self.outbound);
        let info_sequence = outbound.advance();
        self.send_message(&mut outbound.stream, info_sequence, &info.encode())?;

        let reply = self.await_reply(&mut outbound.stream, info_sequence)?;
        outbound.sequence = next_sequence(info_sequence);
        match ControlToken::parse(&reply) {
            Some(ControlToken::Accept) => {},
            Some(ControlToken::Error) => return Err(ChannelError::PeerRejected),
            None => {
                return Err(ChannelError::UnexpectedReply(format!(
                    "{} bytes instead of ACCEPT or ERROR",
                    reply.len()
                )));
            },
        }

        for chunk in data.chunks(self.max_payload) {
            let sequence = outbound.advance();
            self.send_message(&mut outbound.stream, sequence, chunk)?;
        }

        info!(?kind, bytes = data.len(), chunks = count, "transfer sent");
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<(Vec<u8>, Vec<u8>), ChannelError> {
        let storage = |source| ChannelError::Storage { path: path.to_path_buf(), source };

        let size = fs::metadata(path).map_err(storage)?.len();
        if size > MAX_FILE_SIZE {
            return Err(ChannelError::InvalidArgument(format!(
                "{} is {size} bytes, limit is {MAX_FILE_SIZE}",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .map(|name| name.as_encoded_bytes().to_vec())
            .ok_or_else(|| ChannelError::InvalidArgument(format!("{} has no file name", path.display())))?;
        if name.len() > self.max_payload - TransferInfo::MIN_LEN {
            return Err(ChannelError::InvalidArgument(format!(
                "file name of {} bytes is too long",
                name.len()
            )));
        }

        Ok((name, fs::read(path).map_err(storage)?))
    }

    fn recv_transfer(&self) -> Result<Received, ChannelError> {
        let mut inbound = lock(&self.inbound);
        let frame = inbound.stream.read_frame()?;
        let info_sequence = frame.sequence();
        if info_sequence != inbound.expected {
            return Err(ChannelError::ReplayedMessage {
                sequence: info_sequence,
                expected: inbound.expected,
            });
        }

        // Rejected info messages still consume the reply slot.
        let reply = next_sequence(info_sequence);
        inbound.expected = next_sequence(reply);

        let plan = self
            .open_frame(&frame)
            .and_then(|payload| self.plan_transfer(info_sequence, &payload));
        let (info, name, mut buffer) = match plan {
            Ok(plan) => {
                self.send_message(&mut inbound.stream, reply, ACCEPT)?;
                plan
            },
            Err(err) => {
                warn!(%err, "rejecting transfer");
                if let Err(reply_err) = self.send_message(&mut inbound.stream, reply, ERROR) {
                    debug!(%reply_err, "could not deliver ERROR reply");
                }
                return Err(err);
            },
        };
        inbound.expected = buffer.next_transfer_sequence();

        // Unread chunks would be taken for the next info message.
        if let Err(err) = self.collect_chunks(&mut inbound.stream, &mut buffer) {
            if !err.is_socket_closed() {
                warn!(%err, missing = buffer.remaining(), "transfer aborted");
                self.shut_down(ChannelState::Failed);
            }
            return Err(err);
        }
        drop(inbound);

        let data = buffer.assemble();
        info!(kind = ?info.kind, bytes = data.len(), chunks = info.count, "transfer received");
        match name {
            None => Ok(Received::Text(data)),
            Some(name) => self.store_file(&name, &data).map(Received::File),
        }
    }

    fn collect_chunks(
        &self,
        stream: &mut FramedStream<TcpStream>,
        buffer: &mut ReassemblyBuffer,
    ) -> Result<(), ChannelError> {
        while !buffer.is_complete() {
            let (sequence, chunk) = self.recv_message(stream)?;
            buffer.insert(sequence, chunk)?;
        }
        Ok(())
    }

    fn plan_transfer(
        &self,
        info_sequence: u64,
        payload: &[u8],
    ) -> Result<(TransferInfo, Option<String>, ReassemblyBuffer), ChannelError> {
        let info = TransferInfo::decode(payload)?;

        let max_chunks = MAX_FILE_SIZE.div_ceil(self.max_payload as u64);
        if info.count > max_chunks {
            return Err(ProtocolError::InvalidTransferInfo(format!(
                "{} chunks exceeds limit of {max_chunks}",
                info.count
            ))
            .into());
        }

        let name = match info.kind {
            TransferKind::Text => None,
            TransferKind::File => Some(sanitize_filename(&info.filename)?),
        };
        let buffer = ReassemblyBuffer::new(info_sequence, info.count)?;
        Ok((info, name, buffer))
    }

    fn store_file(&self, name: &str, data: &[u8]) -> Result<PathBuf, ChannelError> {
        let mut prefix = [0u8; FILE_PREFIX_BYTES];
        lock(&self.drbg).generate(&mut prefix, None)?;

        fs::create_dir_all(&self.directory).map_err(|source| ChannelError::Storage {
            path: self.directory.clone(),
            source,
        })?;
        let path = self.directory.join(format!("{}_{name}", hex::encode(prefix)));

        let write = |path: &Path| -> io::Result<()> {
            let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
            file.write_all(data)?;
            file.sync_all()
        };
        write(&path).map_err(|source| ChannelError::Storage { path: path.clone(), source })?;

        info!(path = %path.display(), "file stored");
        Ok(path)
    }

    fn seal_frame(&self, sequence: u64, payload: &[u8]) -> Result<Frame, ChannelError> {
        let mut salt = Salt::zeroed();
        lock(&self.drbg).generate(salt.as_mut_bytes(), None)?;

        let mut body = payload.to_vec();
        let tag = self.pipeline.seal(sequence, &salt, &mut body)?;

        let mut integrity = Vec::with_capacity(SALT_SIZE + TAG_SIZE);
        integrity.extend_from_slice(salt.as_bytes());
        integrity.extend_from_slice(&tag);
        Ok(Frame::new(self.suite, sequence, body, integrity)?)
    }

    fn open_frame(&self, frame: &Frame) -> Result<Vec<u8>, ChannelError> {
        if frame.suite() != self.suite {
            warn!(expected = %self.suite, actual = %frame.suite(), "frame uses a different suite");
            return Err(ChannelError::SuiteMismatch { expected: self.suite, actual: frame.suite() });
        }

        let (salt, tag) = frame.integrity().split_at(SALT_SIZE);
        let salt = Salt::from_slice(salt)?;
        let mut payload = frame.payload().to_vec();
        self.pipeline
            .open(frame.sequence(), &salt, tag, &mut payload)
            .inspect_err(|err| warn!(%err, "rejected frame"))?;
        Ok(payload)
    }

    fn send_message(
        &self,
        stream: &mut FramedStream<TcpStream>,
        sequence: u64,
        payload: &[u8],
    ) -> Result<(), ChannelError> {
        let frame = self.seal_frame(sequence, payload)?;
        stream.write_frame(&frame)
    }

    fn recv_message(
        &self,
        stream: &mut FramedStream<TcpStream>,
    ) -> Result<(u64, Vec<u8>), ChannelError> {
        let frame = stream.read_frame()?;
        let payload = self.open_frame(&frame)?;
        Ok((frame.sequence(), payload))
    }

    fn await_reply(
        &self,
        stream: &mut FramedStream<TcpStream>,
        request: u64,
    ) -> Result<Vec<u8>, ChannelError> {
        let (sequence, payload) = self.recv_message(stream)?;
        let expected = next_sequence(request);
        if sequence != expected {
            return Err(ChannelError::UnexpectedReply(format!(
                "reply numbered {sequence:#x}, expected {expected:#x}"
            )));
        }
        Ok(payload)
    }

    fn ensure_ready(&self, operation: &'static str) -> Result<(), ChannelError> {
        match self.state() {
            ChannelState::Ready => Ok(()),
            state => Err(ChannelError::InvalidState { state, operation }),
        }
    }

    /// Apply the lockdown policy to the outcome of `send`/`recv`.
    fn settle<T>(&self, result: Result<T, ChannelError>) -> Result<T, ChannelError> {
        if let Err(err) = &result {
            if err.requires_lockdown() {
                warn!(%err, "locking down channel");
                self.shut_down(ChannelState::Failed);
            } else if err.is_socket_closed() {
                self.shut_down(ChannelState::Closed);
            } else if err.is_fatal() {
                self.shut_down(ChannelState::Failed);
            }
        }
        result
    }

    fn shut_down(&self, target: ChannelState) {
        let mut state = lock(&self.state);
        if *state != ChannelState::Closed && *state != ChannelState::Failed {
            debug!(from = ?*state, to = ?target, "channel state");
            *state = target;
        }
        drop(state);
        self.sockets.shutdown();
    }

    fn transition(&self, to: ChannelState) {
        let mut state = lock(&self.state);
        debug!(from = ?*state, to = ?to, "channel state");
        *state = to;
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.sockets.shutdown();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn clone_stream(stream: &TcpStream, peer: SocketAddr) -> Result<TcpStream, ChannelError> {
    stream.try_clone().map_err(|source| ChannelError::InitConnection { addr: peer, source })
}

/// Accept the peer on a helper thread while dialling it from this one.
fn connect_both(
    listener: TcpListener,
    config: &ChannelConfig,
) -> Result<(TcpStream, TcpStream), ChannelError> {
    let expected = config.peer.ip();
    let wake = listener.local_addr().map(loopback);
    let acceptor = thread::Builder::new()
        .name("crisp-accept".into())
        .spawn(move || accept_from(&listener, expected))
        .map_err(|source| ChannelError::InitConnection { addr: config.peer, source })?;

    let outbound = match connect_with_retry(config.peer, config.connect_retry) {
        Ok(outbound) => outbound,
        Err(err) => {
            // Dial ourselves so the acceptor returns and drops the listener.
            if let Ok(addr) = wake {
                let _ = TcpStream::connect(addr);
            }
            let _ = acceptor.join();
            return Err(err);
        },
    };

    let inbound = match acceptor.join() {
        Ok(result) => result,
        Err(_) => Err(ChannelError::InitConnection {
            addr: config.peer,
            source: io::Error::other("accept thread panicked"),
        }),
    }
    .inspect_err(|_| {
        let _ = outbound.shutdown(Shutdown::Both);
    })?;

    Ok((inbound, outbound))
}

/// Address to reach a listener bound to `addr` from this host.
fn loopback(addr: SocketAddr) -> SocketAddr {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, addr.port())
}

fn prepare<K>(keys: &K) -> Result<(SecretKey, CtrDrbg, u64), ChannelError>
where
    K: MasterKeySource + ?Sized,
{
    let master = keys.load()?;
    let mut drbg = CtrDrbg::new()?;
    let sequence = drbg.next_u64()? & SEQUENCE_MASK;
    Ok((master, drbg, sequence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_base_name() {
        assert_eq!(sanitize_filename(b"../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename(b"report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_filename(b"C:\\Users\\x\\notes.txt").unwrap(), "notes.txt");
        assert_eq!(sanitize_filename(b"/abs/path/a b").unwrap(), "a b");
    }

    #[test]
    fn sanitize_rejects_unusable_names() {
        for raw in [&b""[..], b".", b"..", b"dir/..", b"dir/", b"/", b"bad\0name"] {
            assert!(
                matches!(sanitize_filename(raw), Err(ChannelError::CompromiseAttempt(_))),
                "{raw:?} accepted"
            );
        }
    }

    #[test]
    fn wildcard_listeners_are_reached_over_loopback() {
        let any: SocketAddr = "0.0.0.0:4000".parse().unwrap();
        assert_eq!(loopback(any), "127.0.0.1:4000".parse().unwrap());
        let any6: SocketAddr = "[::]:4000".parse().unwrap();
        assert_eq!(loopback(any6), "[::1]:4000".parse().unwrap());
        let bound: SocketAddr = "10.1.2.3:4000".parse().unwrap();
        assert_eq!(loopback(bound), bound);
    }

    #[test]
    fn sequence_wraps_at_48_bits() {
        assert_eq!(next_sequence(5), 6);
        assert_eq!(next_sequence(SEQUENCE_MASK), 0);
    }
}
