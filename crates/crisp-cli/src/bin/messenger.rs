//! CRISP messenger.
//!
//! # Usage
//!
//! ```bash
//! # Host A (192.0.2.1)
//! crisp-messenger -k master.key -u alice -r bob -p 6000 -a 192.0.2.2:6000
//!
//! # Host B (192.0.2.2)
//! crisp-messenger -k master.key -u bob -r alice -p 6000 -a 192.0.2.1:6000
//!
//! # List suites
//! crisp-messenger -l
//! ```
//!
//! Lines typed on stdin are sent as text. `/file <path>` sends a file,
//! `/quit` closes the channel.

use std::{
    io::{self, BufRead, Write},
    net::SocketAddr,
    path::{Path, PathBuf},
    process,
    sync::Arc,
    thread,
};

use clap::Parser;
use crisp_cli::{channel_exit_code, exit_code, init_logging};
use crisp_core::{
    Channel, ChannelConfig, ChannelError, ChannelState, DEFAULT_DIRECTORY, KeyFile, Outgoing,
    Received, user_tag,
};
use crisp_proto::SuiteId;
use tracing::{error, info, warn};

/// CRISP point-to-point messenger
#[derive(Parser, Debug)]
#[command(name = "crisp-messenger")]
#[command(about = "Authenticated and encrypted point-to-point messenger")]
#[command(version)]
struct Args {
    /// Master key file (8-byte timestamp followed by a 32-byte key)
    #[arg(short = 'k', long, required_unless_present = "list_suites")]
    key_file: Option<PathBuf>,

    /// Cryptographic suite name
    #[arg(short = 'c', long, default_value_t = SuiteId::DEFAULT)]
    suite: SuiteId,

    /// Directory for received files
    #[arg(short = 'd', long, default_value = DEFAULT_DIRECTORY)]
    directory: PathBuf,

    /// Local user name (at most 16 bytes)
    #[arg(short = 'u', long, required_unless_present = "list_suites")]
    local_user: Option<String>,

    /// Remote user name (at most 16 bytes)
    #[arg(short = 'r', long, required_unless_present = "list_suites")]
    remote_user: Option<String>,

    /// Port to accept the peer's connection on
    #[arg(short = 'p', long, required_unless_present = "list_suites")]
    local_port: Option<u16>,

    /// Peer address (ip:port)
    #[arg(short = 'a', long, required_unless_present = "list_suites")]
    peer: Option<SocketAddr>,

    /// Print the supported suites and exit
    #[arg(short = 'l', long)]
    list_suites: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Settings left once `--list-suites` has been ruled out.
struct Session {
    key_file: PathBuf,
    config: ChannelConfig,
    remote_name: String,
}

fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);

    if args.list_suites {
        if let Err(err) = list_suites() {
            error!(%err, "cannot print suites");
            process::exit(exit_code::OTHER);
        }
        return;
    }

    let session = match session(args) {
        Ok(session) => session,
        Err(err) => {
            error!(%err, "invalid arguments");
            process::exit(channel_exit_code(&err));
        },
    };

    if let Err(err) = run(session) {
        error!(%err, category = ?err.category(), "messenger stopped");
        process::exit(channel_exit_code(&err));
    }
}

fn list_suites() -> io::Result<()> {
    let mut out = io::stdout().lock();
    for suite in SuiteId::ALL {
        let marker = if suite == SuiteId::DEFAULT { " (default)" } else { "" };
        writeln!(out, "{suite}{marker}")?;
    }
    Ok(())
}

fn session(args: Args) -> Result<Session, ChannelError> {
    let (Some(key_file), Some(local), Some(remote), Some(local_port), Some(peer)) =
        (args.key_file, args.local_user, args.remote_user, args.local_port, args.peer)
    else {
        return Err(ChannelError::InvalidArgument("missing connection arguments".into()));
    };

    let mut config = ChannelConfig::new(peer, args.suite, user_tag(&local)?, user_tag(&remote)?);
    config.local_port = local_port;
    config.directory = args.directory;
    Ok(Session { key_file, config, remote_name: remote })
}

fn run(session: Session) -> Result<(), ChannelError> {
    info!(
        peer = %session.config.peer,
        port = session.config.local_port,
        suite = %session.config.suite,
        "establishing channel"
    );
    let channel = Arc::new(Channel::establish(&session.config, &KeyFile::new(&session.key_file))?);

    let receiver = Arc::clone(&channel);
    let remote_name = session.remote_name;
    let recv_loop = thread::Builder::new()
        .name("crisp-recv".into())
        .spawn(move || receive_loop(&receiver, &remote_name))
        .map_err(|e| ChannelError::InvalidArgument(format!("cannot start receiver: {e}")))?;

    let sent = send_loop(&channel);
    channel.close();

    let received = recv_loop.join().unwrap_or_else(|_| {
        Err(ChannelError::InvalidArgument("receiver thread panicked".into()))
    });
    sent.and(received)
}

fn receive_loop(channel: &Channel, remote_name: &str) -> Result<(), ChannelError> {
    loop {
        match channel.recv() {
            Ok(Received::Text(text)) => {
                let mut out = io::stdout().lock();
                let _ = writeln!(out, "[{remote_name}] {}", String::from_utf8_lossy(&text));
            },
            Ok(Received::File(path)) => {
                info!(from = remote_name, path = %path.display(), "file received");
            },
            Err(err) if err.is_socket_closed() => {
                info!("channel closed");
                return Ok(());
            },
            Err(err) if err.is_fatal() || channel.state() != ChannelState::Ready => return Err(err),
            Err(err) => warn!(%err, "message dropped"),
        }
    }
}

fn send_loop(channel: &Channel) -> Result<(), ChannelError> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };

        let result = match line.trim_end() {
            "/quit" => break,
            "" => continue,
            command if command.starts_with("/file ") => {
                let path = Path::new(command["/file ".len()..].trim());
                channel.send(Outgoing::File(path)).inspect(|_| {
                    info!(path = %path.display(), "file sent");
                })
            },
            text => channel.send(Outgoing::Text(text.as_bytes())),
        };

        match result {
            Ok(()) => {},
            Err(err) if err.is_socket_closed() => return Ok(()),
            Err(err) if err.is_fatal() || channel.state() != ChannelState::Ready => return Err(err),
            Err(err) => warn!(%err, "message not sent"),
        }
    }
    Ok(())
}
