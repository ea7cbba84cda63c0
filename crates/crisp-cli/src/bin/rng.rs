//! CRISP DRBG output tool.
//!
//! Writes bytes from the Kuznyechik CTR_DRBG, seeded from the operating
//! system, to a file.
//!
//! # Usage
//!
//! ```bash
//! crisp-rng -o random.bin -n 1.5M
//! ```

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
    process,
};

use clap::Parser;
use crisp_cli::{crypto_exit_code, exit_code, init_logging, parse_size};
use crisp_crypto::{CryptoError, CtrDrbg};
use thiserror::Error;
use tracing::{error, info};

/// Bytes generated and written per step.
const BLOCK_SIZE: usize = 8 * 1024;

/// Write DRBG output to a file
#[derive(Parser, Debug)]
#[command(name = "crisp-rng")]
#[command(about = "Write CRISP DRBG output to a file")]
#[command(version)]
struct Args {
    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Number of bytes, with optional K, M or G suffix
    #[arg(short = 'n', long, value_parser = parse_size)]
    size: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Error, Debug)]
enum RngError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("cannot write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RngError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Crypto(err) => crypto_exit_code(err),
            Self::Output { .. } => exit_code::STORAGE,
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);

    if let Err(err) = generate(&args) {
        error!(%err, "generation failed");
        process::exit(err.exit_code());
    }
}

fn generate(args: &Args) -> Result<(), RngError> {
    let output = |source| RngError::Output { path: args.output.clone(), source };

    let mut drbg = CtrDrbg::new()?;
    let mut writer = BufWriter::new(File::create(&args.output).map_err(output)?);

    info!(path = %args.output.display(), bytes = args.size, "generating");
    let mut block = [0u8; BLOCK_SIZE];
    let mut written = 0u64;
    let mut reported = 0u64;
    while written < args.size {
        let len = (args.size - written).min(BLOCK_SIZE as u64) as usize;
        drbg.generate(&mut block[..len], None)?;
        writer.write_all(&block[..len]).map_err(output)?;
        written += len as u64;

        let percent = (u128::from(written) * 100 / u128::from(args.size)) as u64;
        if percent >= reported + 10 {
            reported = percent - percent % 10;
            info!(written, percent, "progress");
        }
    }
    writer.flush().map_err(output)?;
    block.fill(0);

    info!(path = %args.output.display(), bytes = written, "done");
    Ok(())
}
