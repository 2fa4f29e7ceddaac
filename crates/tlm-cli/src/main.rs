/// Telemetry stream command-line tool: decode captured router telemetry
/// into JSON events, or list the frames a capture contains.
///
/// # Command overview
///
/// ```text
/// tlm <COMMAND> [OPTIONS]
///
/// Commands:
///   decode     Decode a capture (or stdin) into JSON lines
///   inspect    List the frame headers in a capture
///   help       Print help information
///
/// Global options:
///   -v, --verbose      Debug-level logging
///   --log-level LEVEL  Explicit tracing filter (overrides -v and RUST_LOG)
///   -h, --help         Print help
///   -V, --version      Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                          |
/// |------|--------------------------------------------------|
/// | 0    | Success                                          |
/// | 1    | Error (I/O failure, bad config, fatal framing)   |
///
/// Logs and errors go to stderr so stdout carries only events.
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tlm_decoder::OutputMode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cmd_decode;
mod cmd_inspect;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// Router telemetry stream decoder.
#[derive(Parser)]
#[command(name = "tlm", version, about = "Telemetry stream decoder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Tracing filter directive, e.g. `tlm_decoder=debug`.
    #[arg(long, global = true)]
    log_level: Option<String>,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Decode a capture into newline-delimited JSON events.
    Decode(DecodeArgs),
    /// List the frames in a capture.
    Inspect(InspectArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `tlm decode`.
///
/// Streams the input through a decoder in `--chunk-size` reads, the way a
/// socket would hand it over, and writes one JSON object per event.
///
/// ```text
/// ┌──────────────┬────────────────────────────────────────────────────────┐
/// │ Flag         │ Effect                                                 │
/// ├──────────────┼────────────────────────────────────────────────────────┤
/// │ --config     │ TOML decoder config (filters, schemas, limits)         │
/// │ --mode       │ raw | flat, overrides the config file                  │
/// │ --chunk-size │ bytes per read (default 64 KiB)                        │
/// │ -o/--output  │ write events to a file instead of stdout               │
/// └──────────────┴────────────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct DecodeArgs {
    /// Capture file to decode, or `-` for stdin.
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Decoder configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output mode: `raw` or `flat`.
    #[arg(long)]
    pub mode: Option<OutputMode>,

    /// Bytes read per chunk.
    #[arg(long, default_value_t = tlm_decoder::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Write events here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `tlm inspect`.
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Capture file to inspect.
    pub file: PathBuf,

    /// Hex dump each payload (16 bytes per line).
    #[arg(long)]
    pub show_hex: bool,

    /// Show only the frame at this zero-based index.
    #[arg(long)]
    pub frame: Option<usize>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let result = init_logging(cli.verbose, cli.log_level.as_deref()).and_then(|()| {
        match cli.command {
            Commands::Decode(args) => cmd_decode::run(&args),
            Commands::Inspect(args) => cmd_inspect::run(&args),
        }
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// Install a stderr subscriber. `--log-level` wins, then `RUST_LOG`, then
/// `debug` or `info` depending on `-v`.
fn init_logging(verbose: bool, level: Option<&str>) -> Result<()> {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|e| anyhow::anyhow!("invalid log level {level:?}: {e}"))?,
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();

    Ok(())
}
