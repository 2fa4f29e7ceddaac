use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

use crate::decoder::TelemetryDecoder;
use crate::error::DecodeError;
use crate::sink::EventSink;

/// Default read size per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Pumps an async byte source into a [`TelemetryDecoder`].
///
/// Each read is handed to [`TelemetryDecoder::accept`] exactly as it came
/// back from the reader, so a socket's natural chunking flows straight
/// through. Backpressure is the reader's: nothing is read until the
/// previous chunk's events have been emitted.
///
/// # Example
///
/// ```rust,no_run
/// use tlm_decoder::{Event, StreamingDecoder, TelemetryDecoder};
///
/// async fn drain(socket: tokio::net::TcpStream) -> Result<Vec<Event>, tlm_decoder::DecodeError> {
///     let mut stream = StreamingDecoder::new(socket, TelemetryDecoder::with_defaults());
///     let mut events: Vec<Event> = Vec::new();
///     stream.run(&mut events).await?;
///     Ok(events)
/// }
/// ```
pub struct StreamingDecoder<R> {
    reader: R,
    decoder: TelemetryDecoder,
    buf: Vec<u8>,
    total: u64,
}

impl<R: AsyncRead + Unpin> StreamingDecoder<R> {
    #[must_use]
    pub fn new(reader: R, decoder: TelemetryDecoder) -> Self {
        Self::with_chunk_size(reader, decoder, DEFAULT_CHUNK_SIZE)
    }

    /// Read at most `chunk_size` bytes per call (minimum 1).
    #[must_use]
    pub fn with_chunk_size(reader: R, decoder: TelemetryDecoder, chunk_size: usize) -> Self {
        Self {
            reader,
            decoder,
            buf: vec![0; chunk_size.max(1)],
            total: 0,
        }
    }

    /// Read one chunk and decode it.
    ///
    /// Returns the number of bytes read; `0` means end of input.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Io`] if the reader fails.
    /// - Anything [`TelemetryDecoder::accept`] returns.
    pub async fn pump<S: EventSink>(&mut self, sink: &mut S) -> Result<usize, DecodeError> {
        let n = self.reader.read(&mut self.buf).await?;
        if n > 0 {
            self.total += n as u64;
            self.decoder.accept(&self.buf[..n], sink)?;
        }
        Ok(n)
    }

    /// Decode until end of input. Returns the total bytes read.
    ///
    /// Bytes of an unfinished frame left at end of input are logged and
    /// discarded.
    ///
    /// # Errors
    ///
    /// Stops at the first error from [`pump`](Self::pump).
    pub async fn run<S: EventSink>(&mut self, sink: &mut S) -> Result<u64, DecodeError> {
        while self.pump(sink).await? > 0 {}

        let leftover = self.decoder.buffered();
        if leftover > 0 {
            warn!(
                leftover,
                waiting_for = self.decoder.pending_bytes(),
                "input ended mid-frame"
            );
        }
        debug!(total = self.total, "stream drained");
        Ok(self.total)
    }

    pub fn decoder(&self) -> &TelemetryDecoder {
        &self.decoder
    }

    /// Bytes read so far.
    pub fn total_read(&self) -> u64 {
        self.total
    }

    pub fn into_inner(self) -> (R, TelemetryDecoder) {
        (self.reader, self.decoder)
    }
}
