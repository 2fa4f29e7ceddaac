/// Implementation of `tlm decode`.
///
/// Reads a capture file (or stdin), pushes it through a
/// [`StreamingDecoder`] and writes every event as one line of JSON.
///
/// ```text
/// $ tlm decode capture.bin --config decoder.toml
/// {"path":"DATA~RootOper~Interfaces~Interface","type":"interface",...}
/// {"path":"DATA~RootOper~Interfaces~Interface","type":"interface",...}
/// ```
///
/// A fatal framing error stops the run with exit code 1; events decoded
/// before it have already been written.
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tlm_decoder::{DecoderConfig, Event, EventSink, StreamingDecoder, TelemetryDecoder};
use tokio::io::AsyncRead;
use tracing::info;

use crate::DecodeArgs;

/// Run the `tlm decode` command.
///
/// # Errors
///
/// Returns an error if the config is invalid, the input or output cannot
/// be opened, writing fails, or the stream hits a fatal decode error.
pub fn run(args: &DecodeArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => DecoderConfig::from_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => DecoderConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    let decoder = TelemetryDecoder::from_config(&config)?;

    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut sink = JsonLines::new(out);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .context("cannot start runtime")?;

    let total = runtime.block_on(async {
        let input = open_input(&args.input).await?;
        let mut stream = StreamingDecoder::with_chunk_size(input, decoder, args.chunk_size);
        stream
            .run(&mut sink)
            .await
            .with_context(|| format!("failed to decode {}", args.input.display()))
    });

    // Flush whatever was decoded, even if the stream failed.
    let written = sink.finish().context("cannot write events")?;
    let total = total?;
    info!(bytes = total, events = written, "decode finished");
    Ok(())
}

async fn open_input(path: &Path) -> Result<Box<dyn AsyncRead + Unpin>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok(Box::new(file))
}

/// Writes each event as a JSON line.
///
/// `emit` cannot fail, so the first write error is held and every later
/// event is dropped until [`finish`](Self::finish) reports it.
struct JsonLines {
    out: BufWriter<Box<dyn Write>>,
    written: usize,
    error: Option<io::Error>,
}

impl JsonLines {
    fn new(out: Box<dyn Write>) -> Self {
        Self {
            out: BufWriter::new(out),
            written: 0,
            error: None,
        }
    }

    fn write(&mut self, event: &Event) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")
    }

    fn finish(mut self) -> io::Result<usize> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.written)
    }
}

impl EventSink for JsonLines {
    fn emit(&mut self, event: Event) {
        if self.error.is_some() {
            return;
        }
        match self.write(&event) {
            Ok(()) => self.written += 1,
            Err(e) => self.error = Some(e),
        }
    }
}
